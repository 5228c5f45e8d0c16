pub mod auth_method;
pub mod credential;
pub mod identity;
pub mod remote_url;
pub mod scm_type;

pub use auth_method::AuthMethod;
pub use credential::Credential;
pub use identity::Identity;
pub use remote_url::{RemoteUrl, RemoteUrlError};
pub use scm_type::ScmType;
