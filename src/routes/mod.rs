use actix_web::web;
use crate::handlers::payment_handlers;

// Payment routes (/api/payments/*). Public: the storefront client calls
// these directly, CORS preflight included.
pub fn configure_payment_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .service(payment_handlers::checkout_key)
            .service(payment_handlers::create_order)
            .service(payment_handlers::verify_payment)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    #[actix_web::test]
    async fn test_routes_compile() {
        let _app = test::init_service(
            actix_web::App::new()
                .configure(configure_payment_routes)
        ).await;
    }
}
