pub mod health;
pub mod secrets;

pub use health::{health_handler, ping_handler, HealthResponse};
pub use secrets::{
    get_by_key_handler, set_by_key_handler, GetByKeyQuery, SetByKeyRequest, ValueResponse,
    CIPHER_HEADER,
};
