use fluent::{FluentArgs, FluentResource};
use fluent_bundle::bundle::FluentBundle;
use include_dir::{include_dir, Dir};
use std::collections::HashMap;
use tracing::{error, info};
use unic_langid::LanguageIdentifier;

// We use the concurrent memoizer to ensure thread safety (Sync + Send)
type ConcurrentBundle = FluentBundle<FluentResource, intl_memoizer::concurrent::IntlLangMemoizer>;

// Embed the locales directory at compile time
static LOCALES_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/locales");

pub struct LocalizationManager {
    bundles: HashMap<LanguageIdentifier, ConcurrentBundle>,
}

impl LocalizationManager {
    pub fn new() -> Self {
        let mut bundles = HashMap::new();

        // Iterate over subdirectories in the embedded locales directory
        for entry in LOCALES_DIR.dirs() {
            let locale_name = entry.path().to_string_lossy();

            if let Ok(lang_id) = locale_name.parse::<LanguageIdentifier>() {
                let mut bundle = ConcurrentBundle::new_concurrent(vec![lang_id.clone()]);

                for file in entry.files() {
                    if file.path().extension().and_then(|e| e.to_str()) != Some("ftl") {
                        continue;
                    }

                    if let Some(content) = file.contents_utf8() {
                        match FluentResource::try_new(content.to_string()) {
                            Ok(resource) => {
                                if let Err(errors) = bundle.add_resource(resource) {
                                    for err in errors {
                                        error!(
                                            "Error adding resource for {}: {:?}",
                                            locale_name, err
                                        );
                                    }
                                }
                            }
                            Err((_, errors)) => {
                                for err in errors {
                                    error!(
                                        "Error parsing resource for {}: {:?}",
                                        locale_name, err
                                    );
                                }
                            }
                        }
                    }
                }

                info!("Loaded embedded locale: {}", locale_name);
                bundles.insert(lang_id, bundle);
            }
        }

        Self { bundles }
    }

    pub fn translate(&self, locale: &str, key: &str, args: Option<&FluentArgs>) -> String {
        let lang_id = locale
            .parse::<LanguageIdentifier>()
            .unwrap_or_else(|_| "en-US".parse().unwrap());

        let bundle = self.bundles.get(&lang_id).or_else(|| {
            // Fallback to en-US if the requested locale is not available
            self.bundles.get(&"en-US".parse().unwrap())
        });

        if let Some(bundle) = bundle {
            if let Some(msg) = bundle.get_message(key) {
                if let Some(pattern) = msg.value() {
                    let mut errors = vec![];
                    return bundle
                        .format_pattern(pattern, args, &mut errors)
                        .into_owned();
                }
            }
        }

        key.to_string()
    }
}

impl Default for LocalizationManager {
    fn default() -> Self {
        Self::new()
    }
}

/// A proxy for translation that holds a reference to the manager and a specific locale
pub struct L10nProxy<'a> {
    manager: &'a LocalizationManager,
    locale: String,
}

impl<'a> L10nProxy<'a> {
    pub fn t(&self, key: &str, args: Option<&FluentArgs>) -> String {
        self.manager.translate(&self.locale, key, args)
    }
}

/// Helper trait to add localization to the Poise context
pub trait ContextL10nExt {
    fn l10n_guild(&self) -> L10nProxy<'_>;
    fn l10n_user_option(&self) -> Option<L10nProxy<'_>>;
}

impl ContextL10nExt for crate::Context<'_> {
    fn l10n_guild(&self) -> L10nProxy<'_> {
        // Guild locale first, then the interaction locale, then en-US
        self.guild()
            .map(|guild| guild.preferred_locale.clone())
            .map(|locale| L10nProxy {
                manager: &self.data().l10n,
                locale,
            })
            .or_else(|| self.l10n_user_option())
            .unwrap_or_else(|| L10nProxy {
                manager: &self.data().l10n,
                locale: "en-US".to_string(),
            })
    }

    fn l10n_user_option(&self) -> Option<L10nProxy<'_>> {
        self.locale().map(|locale| L10nProxy {
            manager: &self.data().l10n,
            locale: locale.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_locales_load_independent_of_cwd() {
        // Bundles are compiled into the binary, so the manager must resolve
        // keys no matter where the process was launched from.
        let manager = LocalizationManager::new();

        assert_eq!(
            manager.translate("en-US", "invites-module-disabled", None),
            "Invite tracking is not enabled on this server."
        );
    }

    #[test]
    fn test_unknown_locale_falls_back_to_en_us() {
        let manager = LocalizationManager::new();

        assert_eq!(
            manager.translate("tr", "ranks-module-disabled", None),
            "Invite ranks are not enabled on this server."
        );
    }

    #[test]
    fn test_unknown_key_returns_key() {
        let manager = LocalizationManager::new();

        assert_eq!(manager.translate("en-US", "no-such-key", None), "no-such-key");
    }

    #[test]
    fn test_plural_selection() {
        let manager = LocalizationManager::new();

        let mut args = FluentArgs::new();
        args.set("days", 0);
        assert_eq!(
            manager.translate("en-US", "time-days-ago", Some(&args)),
            "today"
        );

        let mut args = FluentArgs::new();
        args.set("days", 14);
        let rendered = manager.translate("en-US", "time-days-ago", Some(&args));
        assert!(rendered.contains("days ago"), "got {:?}", rendered);
    }
}
