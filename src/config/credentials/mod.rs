use super::schema::Config;

macro_rules! define_credentials {
    ($( $name:literal, $env:literal => $($path:ident).+ );* $(;)?) => {
        /// All known credential slot names.
        pub const CREDENTIAL_NAMES: &[&str] = &[$($name),*];

        /// (slot name, env var name) pairs.
        pub const CREDENTIAL_ENV_VARS: &[(&str, &str)] = &[$(($name, $env)),*];

        /// Get the current value of a credential field by slot name.
        pub fn get_credential_value<'a>(config: &'a Config, name: &str) -> Option<&'a str> {
            match name {
                $($name => Some(config.$($path).+.as_str()),)*
                _ => None,
            }
        }

        /// Apply environment variable overrides.
        ///
        /// Any `REELAY_*` env var that is set and non-empty overwrites the
        /// corresponding config field, so secrets can be injected without
        /// touching the config file.
        pub fn apply_env_overrides(config: &mut Config) {
            $(
                if let Ok(val) = std::env::var($env) {
                    if !val.is_empty() {
                        config.$($path).+ = val;
                    }
                }
            )*
        }
    };
}

define_credentials! {
    "discord-token",            "REELAY_DISCORD_TOKEN"            => discord.token;
    "discord-public-key",       "REELAY_DISCORD_PUBLIC_KEY"       => discord.public_key;
    "instagram-access-token",   "REELAY_INSTAGRAM_ACCESS_TOKEN"   => instagram.access_token;
    "instagram-verify-token",   "REELAY_INSTAGRAM_VERIFY_TOKEN"   => instagram.verify_token;
    "instagram-app-secret",     "REELAY_INSTAGRAM_APP_SECRET"     => instagram.app_secret;
}

/// Report where a credential value came from, for `reelay check`.
pub fn detect_source(name: &str, config: &Config) -> &'static str {
    let env_var = CREDENTIAL_ENV_VARS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, e)| *e);

    if let Some(var) = env_var
        && let Ok(val) = std::env::var(var)
        && !val.is_empty()
    {
        return "env";
    }

    if let Some(val) = get_credential_value(config, name)
        && !val.is_empty()
    {
        return "config";
    }

    "[empty]"
}
