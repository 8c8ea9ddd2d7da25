//! The channels whose upload playlists can be browsed.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A supported channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    AyatsunoYuni,
    SakihaneHuya,
    SirayukiHina,
    NenekoMashiro,
    AkaneLize,
    ArahashiTabi,
    TenkoShibuki,
    AokumoRin,
    HanakoNana,
    YuzuhaRiko,
}

impl Channel {
    /// Every supported channel, in menu order.
    pub const ALL: [Self; 10] = [
        Self::AyatsunoYuni,
        Self::SakihaneHuya,
        Self::SirayukiHina,
        Self::NenekoMashiro,
        Self::AkaneLize,
        Self::ArahashiTabi,
        Self::TenkoShibuki,
        Self::AokumoRin,
        Self::HanakoNana,
        Self::YuzuhaRiko,
    ];

    /// Human-readable channel name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::AyatsunoYuni => "아야츠노 유니",
            Self::SakihaneHuya => "사키하네 후야",
            Self::SirayukiHina => "시라유키 히나",
            Self::NenekoMashiro => "네네코 마시로",
            Self::AkaneLize => "아카네 리제",
            Self::ArahashiTabi => "아라하시 타비",
            Self::TenkoShibuki => "텐코 시부키",
            Self::AokumoRin => "아오쿠모 린",
            Self::HanakoNana => "하나코 나나",
            Self::YuzuhaRiko => "유즈하 리코",
        }
    }

    /// Id of the channel's uploads playlist.
    #[must_use]
    pub const fn playlist_id(self) -> &'static str {
        match self {
            Self::AyatsunoYuni => "UUlbYIn9LDbbFZ9w2shX3K0g",
            Self::SakihaneHuya => "UU0YQnenKBCu5sGb7H61n6HA",
            Self::SirayukiHina => "UU1afpiIuBDcjYlmruAa0HiA",
            Self::NenekoMashiro => "UU_eeSpMBz8PG4ssdBPnP07g",
            Self::AkaneLize => "UU7-m6jQLinZQWIbwm9W-1iw",
            Self::ArahashiTabi => "UUAHVQ44O81aehLWfy9O6Elw",
            Self::TenkoShibuki => "UUYxLMfeX1CbMBll9MsGlzmw",
            Self::AokumoRin => "UUQmcltnre6aG9SkDRYZqFIg",
            Self::HanakoNana => "UUcA21_PzN1EhNe7xS4MJGsQ",
            Self::YuzuhaRiko => "UUj0c1jUr91dTetIQP2pFeLA",
        }
    }

    /// Remote directory name for the channel's uploads.
    #[must_use]
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::AyatsunoYuni => "AyatsunoYuni",
            Self::SakihaneHuya => "SakihaneHuya",
            Self::SirayukiHina => "SirayukiHina",
            Self::NenekoMashiro => "NenekoMashiro",
            Self::AkaneLize => "AkaneLize",
            Self::ArahashiTabi => "ArahashiTabi",
            Self::TenkoShibuki => "TenkoShibuki",
            Self::AokumoRin => "AokumoRin",
            Self::HanakoNana => "HanakoNana",
            Self::YuzuhaRiko => "YuzuhaRiko",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Channel {
    type Err = Error;

    /// Matches a namespace case-insensitively, or a display name exactly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.namespace().eq_ignore_ascii_case(wanted) || c.display_name() == wanted)
            .ok_or_else(|| Error::Configuration(format!("unknown channel: {wanted}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn parses_namespace_case_insensitively() {
        assert_eq!("sirayukihina".parse::<Channel>().unwrap(), Channel::SirayukiHina);
        assert_eq!(" AokumoRin ".parse::<Channel>().unwrap(), Channel::AokumoRin);
    }

    #[test]
    fn parses_display_name() {
        assert_eq!("유즈하 리코".parse::<Channel>().unwrap(), Channel::YuzuhaRiko);
    }

    #[test]
    fn unknown_channel_is_configuration_error() {
        assert!(matches!(
            "nobody".parse::<Channel>(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn identifiers_are_unique() {
        let playlists: HashSet<_> = Channel::ALL.iter().map(|c| c.playlist_id()).collect();
        let namespaces: HashSet<_> = Channel::ALL.iter().map(|c| c.namespace()).collect();
        assert_eq!(playlists.len(), Channel::ALL.len());
        assert_eq!(namespaces.len(), Channel::ALL.len());
    }

    #[test]
    fn namespaces_are_single_path_segments() {
        for channel in Channel::ALL {
            assert!(!channel.namespace().contains(['/', '\\', ' ']));
        }
    }
}
