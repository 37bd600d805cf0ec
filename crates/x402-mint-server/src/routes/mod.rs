pub mod health;
pub mod mint;
pub mod pages;
pub mod premium;

use actix_web::web;

/// Mount every route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::configure)
        .configure(pages::configure)
        .configure(premium::configure)
        .configure(mint::configure);
}
