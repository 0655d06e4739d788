//! Integration tests over the in-memory store

mod api_tests;
mod booking_flow;
