//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password authentication and JWT issuing for customers and the back office
//! - `images` - Product image storage (Cloudinary or local disk)
//! - `notifications` - In-memory back-office notification feed
//! - `orders` - Checkout, cancellation and status workflow

pub mod auth;
pub mod images;
pub mod notifications;
pub mod orders;
