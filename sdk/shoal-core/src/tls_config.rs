#[cfg(feature = "rustls-tls")]
use std::sync::Arc;
#[cfg(feature = "rustls-tls")]
pub type TlsConfig = Arc<tokio_rustls::rustls::ClientConfig>;

#[cfg(not(feature = "rustls-tls"))]
compile_error!("The 'rustls-tls' feature must be enabled.");
