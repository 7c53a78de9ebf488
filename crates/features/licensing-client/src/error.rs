use std::borrow::Cow;

/// Errors surfaced by the client-side license manager (C6) and feature manager (C7).
#[mhub_derive::mhub_error]
pub enum ManagerError {
    /// The envelope codec or serializer rejected the loaded license.
    #[error("failed to load license{}: {source}", format_context(.context))]
    Codec {
        #[source]
        source: mhub_licensing::LicenseError,
        context: Option<Cow<'static, str>>,
    },

    /// A validation rule rejected the license against the current machine/user.
    #[error("license failed validation{}: {source}", format_context(.context))]
    Invalid {
        #[source]
        source: mhub_licensing::LicenseError,
        context: Option<Cow<'static, str>>,
    },

    /// No license has been loaded yet, or it was explicitly closed.
    #[error("no license is currently loaded{}", format_context(.context))]
    NotLoaded { context: Option<Cow<'static, str>> },

    /// The activation server rejected or could not be reached for an online operation.
    #[error("activation server request failed{}: {message}", format_context(.context))]
    Transport { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Filesystem I/O on the license path failed.
    #[error("license file I/O error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("internal license manager error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Errors surfaced by the feature manager (C7).
#[mhub_derive::mhub_error]
pub enum FeatureError {
    /// No license is loaded, so no features are available.
    #[error("no license is currently loaded{}", format_context(.context))]
    NotLoaded { context: Option<Cow<'static, str>> },

    /// The requested feature is not present, or present but not enabled.
    #[error("feature '{name}' is not licensed{}", format_context(.context))]
    FeatureNotLicensed { name: String, context: Option<Cow<'static, str>> },
}
