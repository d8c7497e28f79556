use std::env;

const DEFAULT_DATABASE_NAME: &str = "eventbase";
const DEFAULT_PORT: &str = "3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    pub database_name: String,
    pub port: u16,
}

impl Config {
    /// Loads configuration from the environment. A missing `MONGODB_URI` is
    /// fatal here, once, at process startup rather than per request.
    pub fn from_env() -> Config {
        let mongodb_uri = env::var("MONGODB_URI")
            .expect("MONGODB_URI must be set (in the environment or a .env file)");
        let database_name =
            env::var("MONGODB_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE_NAME.to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| DEFAULT_PORT.to_string())
            .parse()
            .expect("PORT must be a valid port number");
        Config {
            mongodb_uri,
            database_name,
            port,
        }
    }
}
