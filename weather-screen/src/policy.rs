use weather_domain::ErrorClass;

/// The operations the screen runs against its collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Locate,
    ResolveCityId,
    FetchWeather,
}

impl Operation {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Operation::Locate => "locate",
            Operation::ResolveCityId => "resolve_city_id",
            Operation::FetchWeather => "fetch_weather",
        }
    }

    /// What a failure of this operation does to the banner flags, on top
    /// of publishing `error`. City-id lookup is the only operation with
    /// class-specific handling; location and weather failures surface
    /// through `error` alone.
    pub(crate) fn banner_effect(self, class: ErrorClass) -> BannerEffect {
        match self {
            Operation::ResolveCityId => match class {
                ErrorClass::Connectivity => BannerEffect::RaiseConnectivityBanner,
                // Known quirk, kept on purpose: a protocol failure writes
                // the HTTP banner flag to `false` instead of `true`, so an
                // HTTP failure alone never shows that banner. The UI
                // contract grew around this and tests pin the exact write;
                // do not "fix" it here without renegotiating that contract.
                ErrorClass::Protocol => BannerEffect::LowerHttpBanner,
                ErrorClass::Generic => BannerEffect::None,
            },
            Operation::Locate | Operation::FetchWeather => BannerEffect::None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Banner-flag side effect of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BannerEffect {
    /// `show_connectivity_error` goes up.
    RaiseConnectivityBanner,
    /// `show_http_error` is written `false`.
    LowerHttpBanner,
    /// Only `error` is published.
    None,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_city_id_lookup_touches_banner_flags() {
        for class in ErrorClass::all() {
            assert_eq!(Operation::Locate.banner_effect(*class), BannerEffect::None);
            assert_eq!(
                Operation::FetchWeather.banner_effect(*class),
                BannerEffect::None
            );
        }
    }

    #[test]
    fn city_id_lookup_routes_per_class() {
        assert_eq!(
            Operation::ResolveCityId.banner_effect(ErrorClass::Connectivity),
            BannerEffect::RaiseConnectivityBanner
        );
        assert_eq!(
            Operation::ResolveCityId.banner_effect(ErrorClass::Protocol),
            BannerEffect::LowerHttpBanner
        );
        assert_eq!(
            Operation::ResolveCityId.banner_effect(ErrorClass::Generic),
            BannerEffect::None
        );
    }
}
