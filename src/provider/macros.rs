use super::{Provider, ProviderInfo};
use crate::error::Result;

/// One registry entry: the metadata shown by [`super::providers`], the URI
/// schemes the backend answers to, and the factory that builds it from a
/// parsed spec.
#[doc(hidden)]
pub struct ProviderRegistration {
    pub info: ProviderInfo,
    pub schemes: &'static [&'static str],
    pub build: fn(&url::Url) -> Result<Box<dyn Provider>>,
}

/// Distributed slice collecting every registered provider backend.
#[doc(hidden)]
#[linkme::distributed_slice]
pub static PROVIDER_REGISTRY: [ProviderRegistration];

/// Registers a provider backend with the URI-spec registry.
///
/// The provider gets `PROVIDER_NAME` and `PROVIDER_SECURITY` consts so its
/// `Provider` impl and its registry entry cannot drift apart, and a registry
/// entry whose factory goes URI → config → provider.
///
/// ```ignore
/// register_provider! {
///     provider: EnvProvider,
///     config: EnvConfig,
///     name: "env",
///     security: Secure,
///     description: "Process environment variables (secure, read-only)",
///     schemes: ["env"],
///     examples: ["env://"],
/// }
/// ```
#[doc(hidden)]
#[macro_export]
macro_rules! register_provider {
    (
        provider: $provider:ident,
        config: $config:ty,
        name: $name:expr,
        security: $security:ident,
        description: $description:expr,
        schemes: [$($scheme:expr),* $(,)?],
        examples: [$($example:expr),* $(,)?] $(,)?
    ) => {
        impl $provider {
            const PROVIDER_NAME: &'static str = $name;
            const PROVIDER_SECURITY: $crate::provider::SecurityClass =
                $crate::provider::SecurityClass::$security;
        }

        const _: () = {
            #[linkme::distributed_slice($crate::provider::PROVIDER_REGISTRY)]
            static REGISTRATION: $crate::provider::ProviderRegistration =
                $crate::provider::ProviderRegistration {
                    info: $crate::provider::ProviderInfo {
                        name: $name,
                        security: <$provider>::PROVIDER_SECURITY,
                        description: $description,
                        examples: &[$($example,)*],
                    },
                    schemes: &[$($scheme,)*],
                    build: |url| {
                        let config = <$config>::try_from(url)?;
                        Ok(Box::new(<$provider>::new(config)))
                    },
                };
        };
    };
}
