pub mod config;
pub mod domain {
    pub mod donation;
    pub mod result;
}
pub mod signing {
    pub mod check_mac;
    pub mod trade_cipher;
}
pub mod gateways;
pub mod lifecycle {
    pub mod transitions;
}
pub mod http {
    pub mod handlers {
        pub mod donations;
        pub mod payments;
        pub mod settings;
    }
    pub mod middleware {
        pub mod admin_auth;
        pub mod rate_limit;
    }
}
pub mod repo {
    pub mod donations_repo;
    pub mod receipt_outbox_repo;
    pub mod site_settings_repo;
}
pub mod service {
    pub mod callback_service;
    pub mod checkout_service;
    pub mod receipt_relay;
    pub mod settings_cache;
}

#[derive(Clone)]
pub struct AppState {
    pub donations_repo: repo::donations_repo::DonationsRepo,
    pub checkout_service: service::checkout_service::CheckoutService,
    pub callback_service: service::callback_service::CallbackService,
    pub settings_cache: service::settings_cache::SettingsCache,
    pub registry: gateways::GatewayRegistry,
}
