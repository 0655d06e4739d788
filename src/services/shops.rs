//! Shop lookup and owner checks

use rust_decimal::Decimal;
use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{Money, NewService, NewShop, Service, Shop},
    repository::Repository,
};

/// Shop fields an owner may change; absent fields keep their value
#[derive(Debug, Default, Clone)]
pub struct ShopChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    pub timezone: Option<String>,
}

/// Service fields an owner may change; the price keeps its currency
#[derive(Debug, Default, Clone)]
pub struct ServiceChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub duration_minutes: Option<u32>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct ShopsService {
    repository: Repository,
}

impl ShopsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_by_slug(&self, slug: &str) -> AppResult<Shop> {
        self.repository
            .shops
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shop '{}' not found", slug)))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Shop> {
        self.repository
            .shops
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", id)))
    }

    pub async fn list_for_owner(&self, owner_id: i32) -> AppResult<Vec<Shop>> {
        self.repository.shops.find_by_owner_id(owner_id).await
    }

    /// Shop `shop_id`, provided `owner_id` owns it
    pub async fn owned_shop(&self, owner_id: i32, shop_id: i32) -> AppResult<Shop> {
        let shop = self.get_by_id(shop_id).await?;
        if !shop.is_owned_by(owner_id) {
            tracing::warn!(owner_id, shop_id, "Access to a shop owned by someone else");
            return Err(AppError::Authorization(
                "You do not own this shop".to_string(),
            ));
        }
        Ok(shop)
    }

    #[instrument(name = "shops.create", skip(self, data), fields(slug = %data.slug))]
    pub async fn create(&self, data: NewShop) -> AppResult<Shop> {
        let shop = self.repository.shops.create(Shop::new(data)?).await?;
        tracing::info!(shop_id = ?shop.id(), "Shop created");
        Ok(shop)
    }

    #[instrument(name = "shops.update", skip(self, changes))]
    pub async fn update(&self, owner_id: i32, shop_id: i32, changes: ShopChanges) -> AppResult<Shop> {
        let mut shop = self.owned_shop(owner_id, shop_id).await?;
        if let Some(name) = changes.name {
            shop.set_name(name)?;
        }
        if let Some(slug) = changes.slug {
            shop.set_slug(slug)?;
        }
        if let Some(timezone) = changes.timezone {
            shop.set_timezone(timezone)?;
        }
        if changes.description.is_some() {
            shop.set_description(changes.description);
        }
        if changes.address.is_some() {
            shop.set_address(changes.address);
        }
        if changes.logo_url.is_some() {
            shop.set_logo_url(changes.logo_url);
        }
        self.repository.shops.update(shop).await
    }

    /// Add a service to a shop owned by `owner_id`
    #[instrument(name = "shops.add_service", skip(self, data))]
    pub async fn add_service(&self, owner_id: i32, shop_id: i32, data: NewService) -> AppResult<Service> {
        let mut shop = self.owned_shop(owner_id, shop_id).await?;
        let service = Service::new(NewService { shop_id, ..data })?;
        shop.add_service(service.clone())?;
        let service = self.repository.services.create(service).await?;
        tracing::info!(service_id = ?service.id(), "Service added");
        Ok(service)
    }

    /// Every service of an owned shop, inactive ones included
    pub async fn list_services(&self, owner_id: i32, shop_id: i32) -> AppResult<Vec<Service>> {
        Ok(self.owned_shop(owner_id, shop_id).await?.services().to_vec())
    }

    /// Edit a service; inactive services are no longer offered
    #[instrument(name = "shops.update_service", skip(self, changes))]
    pub async fn update_service(
        &self,
        owner_id: i32,
        shop_id: i32,
        service_id: i32,
        changes: ServiceChanges,
    ) -> AppResult<Service> {
        let shop = self.owned_shop(owner_id, shop_id).await?;
        let mut service = shop
            .services()
            .iter()
            .find(|s| s.id() == Some(service_id))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Service {} not found", service_id)))?;

        if let Some(name) = changes.name {
            service.set_name(name)?;
        }
        if changes.description.is_some() {
            service.set_description(changes.description);
        }
        if let Some(amount) = changes.price {
            let price = Money::new(amount, service.price().currency())?;
            service.set_price(price)?;
        }
        if let Some(minutes) = changes.duration_minutes {
            service.set_duration_minutes(minutes)?;
        }
        match changes.is_active {
            Some(true) => service.activate(),
            Some(false) => service.deactivate(),
            None => {}
        }
        self.repository.services.update(service).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_shop(slug: &str, owner_id: i32) -> NewShop {
        NewShop {
            name: "Barbearia Central".to_string(),
            slug: slug.to_string(),
            description: None,
            address: None,
            logo_url: None,
            owner_id,
            timezone: Some("America/Sao_Paulo".to_string()),
        }
    }

    fn haircut() -> NewService {
        NewService {
            shop_id: 0,
            name: "Haircut".to_string(),
            description: None,
            price: Money::brl(Decimal::new(4000, 2)).unwrap(),
            duration_minutes: 30,
        }
    }

    #[tokio::test]
    async fn test_owner_checks() {
        let service = ShopsService::new(Repository::in_memory());
        let shop = service.create(new_shop("central", 10)).await.unwrap();
        let shop_id = shop.persisted_id().unwrap();

        assert!(service.owned_shop(10, shop_id).await.is_ok());
        assert!(matches!(
            service.owned_shop(11, shop_id).await,
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            service.owned_shop(10, 999).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(service.list_for_owner(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_services_are_loaded_with_the_shop() {
        let service = ShopsService::new(Repository::in_memory());
        let shop_id = service
            .create(new_shop("central", 10))
            .await
            .unwrap()
            .persisted_id()
            .unwrap();

        let cut = service.add_service(10, shop_id, haircut()).await.unwrap();
        let cut_id = cut.persisted_id().unwrap();
        let shop = service.get_by_slug("central").await.unwrap();
        assert!(shop.active_service(cut_id).is_some());

        let off = ServiceChanges {
            is_active: Some(false),
            ..Default::default()
        };
        service.update_service(10, shop_id, cut_id, off).await.unwrap();
        let shop = service.get_by_id(shop_id).await.unwrap();
        assert!(shop.active_service(cut_id).is_none());
        assert_eq!(service.list_services(10, shop_id).await.unwrap().len(), 1);

        let stored = service.repository.services.find_by_shop_id(shop_id).await.unwrap();
        assert!(!stored[0].is_active());
    }

    #[tokio::test]
    async fn test_update_service_validates_and_keeps_currency() {
        let service = ShopsService::new(Repository::in_memory());
        let shop_id = service
            .create(new_shop("central", 10))
            .await
            .unwrap()
            .persisted_id()
            .unwrap();
        let cut_id = service
            .add_service(10, shop_id, haircut())
            .await
            .unwrap()
            .persisted_id()
            .unwrap();

        let changes = ServiceChanges {
            price: Some(Decimal::new(5550, 2)),
            duration_minutes: Some(45),
            ..Default::default()
        };
        let updated = service.update_service(10, shop_id, cut_id, changes).await.unwrap();
        assert_eq!(updated.price().amount(), Decimal::new(5550, 2));
        assert_eq!(updated.price().currency(), "BRL");
        assert_eq!(updated.duration_minutes(), 45);

        let zero = ServiceChanges {
            duration_minutes: Some(0),
            ..Default::default()
        };
        assert!(service.update_service(10, shop_id, cut_id, zero).await.is_err());
        assert!(matches!(
            service.update_service(11, shop_id, cut_id, ServiceChanges::default()).await,
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            service.update_service(10, shop_id, 999, ServiceChanges::default()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_validates_and_keeps_slug_unique() {
        let service = ShopsService::new(Repository::in_memory());
        service.create(new_shop("first", 1)).await.unwrap();
        let second = service.create(new_shop("second", 1)).await.unwrap();
        let id = second.persisted_id().unwrap();

        let taken = ShopChanges {
            slug: Some("first".to_string()),
            ..Default::default()
        };
        assert!(service.update(1, id, taken).await.is_err());

        let bad_tz = ShopChanges {
            timezone: Some("Atlantis/Deep".to_string()),
            ..Default::default()
        };
        assert!(service.update(1, id, bad_tz).await.is_err());

        let changes = ShopChanges {
            address: Some("Rua Augusta 100".to_string()),
            ..Default::default()
        };
        let updated = service.update(1, id, changes).await.unwrap();
        assert_eq!(updated.address(), Some("Rua Augusta 100"));
        assert_eq!(service.get_by_slug("second").await.unwrap().address(), Some("Rua Augusta 100"));
    }
}
