pub mod dishes;
pub mod users;

pub struct ApiUrls {
    pub catalog_service_url: String,
    pub accounts_service_url: String,
}

impl ApiUrls {
    pub fn init() -> Self {
        Self {
            catalog_service_url: Self::get_catalog_service_url(),
            accounts_service_url: Self::get_accounts_service_url(),
        }
    }

    pub fn get_catalog_service_url() -> String {
        std::env::var("CATALOG_SERVICE_URL")
            .unwrap_or("http://localhost:3000/catalog-service".to_string())
    }

    pub fn get_accounts_service_url() -> String {
        std::env::var("ACCOUNTS_SERVICE_URL")
            .unwrap_or("http://localhost:3000/accounts-service".to_string())
    }
}
