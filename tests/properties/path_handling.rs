//! Property tests for path normalization and URL generation.

use proptest::prelude::*;

use sitemill::{Config, Resource};

fn path_segment() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9._ -]{1,12}").unwrap()
}

fn relative_path() -> impl Strategy<Value = String> {
    proptest::collection::vec(path_segment(), 1..=4).prop_map(|segments| segments.join("/"))
}

proptest! {
    /// PROPERTY: Resource paths never keep a leading slash or a raw space,
    /// however the input was written.
    #[test]
    fn property_addressable_paths_are_normalized(
        rel in relative_path(),
        leading_slash in any::<bool>(),
    ) {
        let input = if leading_slash { format!("/{rel}") } else { rel };
        let resource = Resource::injected(&input);

        prop_assert!(!resource.path().starts_with('/'));
        prop_assert!(!resource.path().contains(' '));
        prop_assert_eq!(resource.path(), resource.destination_path());
    }

    /// PROPERTY: Constructing a resource twice from its own path is a
    /// fixpoint; normalization does not keep rewriting.
    #[test]
    fn property_normalization_is_idempotent(rel in relative_path()) {
        let once = Resource::injected(&rel);
        let twice = Resource::injected(once.path());

        prop_assert_eq!(once.path(), twice.path());
    }

    /// PROPERTY: Generated URLs are absolute and never contain an empty
    /// path segment.
    #[test]
    fn property_urls_are_absolute_and_clean(rel in relative_path()) {
        let config = Config::default();
        let url = Resource::injected(&rel).url(&config);

        prop_assert!(url.starts_with('/'));
        prop_assert!(!url.contains("//"));
    }

    /// PROPERTY: URL generation never panics, whatever the prefix and
    /// trailing-slash policy.
    #[test]
    fn property_url_never_panics(
        rel in relative_path(),
        prefix in proptest::string::string_regex("/[a-z/]{0,10}").unwrap(),
        strip in any::<bool>(),
        trailing in any::<bool>(),
    ) {
        let config = Config {
            http_prefix: prefix,
            strip_index_file: strip,
            trailing_slash: trailing,
            ..Config::default()
        };
        let _ = Resource::injected(&rel).url(&config);
    }
}
