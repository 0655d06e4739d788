//! Customer identity for public bookings

use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{customer, Customer, CustomerContact},
    repository::Repository,
};

#[derive(Clone)]
pub struct CustomersService {
    repository: Repository,
}

impl CustomersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get(&self, id: i32) -> AppResult<Customer> {
        self.repository
            .customers
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Customer {} not found", id)))
    }

    /// Existing customer matched by email, then by phone; a new one otherwise.
    /// A returning customer keeps the name stored on first booking.
    #[instrument(name = "customers.find_or_create", skip_all)]
    pub async fn find_or_create(&self, contact: CustomerContact) -> AppResult<Customer> {
        let email = customer::normalize_email(&contact.email)?;
        if let Some(found) = self.repository.customers.find_by_email(&email).await? {
            return Ok(found);
        }
        let phone = customer::normalize_phone(&contact.phone)?;
        if let Some(found) = self.repository.customers.find_by_phone(&phone).await? {
            return Ok(found);
        }

        let created = self.repository.customers.create(Customer::new(contact)?).await?;
        tracing::info!(customer_id = ?created.id(), "Customer created");
        Ok(created)
    }
}
