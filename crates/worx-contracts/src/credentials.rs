use std::fmt;

/// Key store slot holding a manually entered key.
pub const MANUAL_KEY_SLOT: &str = "worxphere_manual_key";

/// Where users register a key when no host key selector is available.
pub const KEY_REGISTRATION_URL: &str = "https://aistudio.google.com/app/apikey";

/// The key the current session trusts.
///
/// `DeferToEnvironment` means the user picked a key through the host key
/// selector; the value itself is injected by the environment and never held
/// here.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum SessionKey {
    #[default]
    Unset,
    DeferToEnvironment,
    Manual(String),
}

impl SessionKey {
    /// Blank input is the "use the environment key" signal.
    pub fn from_saved(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Self::DeferToEnvironment
        } else {
            Self::Manual(trimmed.to_string())
        }
    }

    pub fn manual_key(&self) -> Option<&str> {
        match self {
            Self::Manual(key) => Some(key.as_str()),
            _ => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Unset => "not configured",
            Self::DeferToEnvironment => "host-selected key",
            Self::Manual(_) => "manual key",
        }
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("Unset"),
            Self::DeferToEnvironment => f.write_str("DeferToEnvironment"),
            Self::Manual(_) => f.write_str("Manual(<redacted>)"),
        }
    }
}

/// Answer of the optional host key selector to "has a key been selected".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKeyStatus {
    Unavailable,
    NotSelected,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Manual,
    Environment,
}

impl KeySource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Environment => "environment",
        }
    }
}

/// The credential a generation call will use.
///
/// An environment-sourced key may turn out to be absent even though the host
/// reported a selection; the generation client refuses to call out in that
/// case.
#[derive(Clone, PartialEq, Eq)]
pub struct EffectiveKey {
    source: KeySource,
    value: Option<String>,
}

impl EffectiveKey {
    pub fn source(&self) -> KeySource {
        self.source
    }

    pub fn value(&self) -> Option<&str> {
        self.value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

impl fmt::Debug for EffectiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectiveKey")
            .field("source", &self.source)
            .field("present", &self.value().is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResolution {
    Resolved(EffectiveKey),
    NeedsKey,
}

/// Manual key, then host-selected environment key, then nothing.
pub fn resolve_key(
    manual: Option<&str>,
    host: HostKeyStatus,
    environment_key: Option<&str>,
) -> KeyResolution {
    if let Some(key) = manual.map(str::trim).filter(|key| !key.is_empty()) {
        return KeyResolution::Resolved(EffectiveKey {
            source: KeySource::Manual,
            value: Some(key.to_string()),
        });
    }
    if host == HostKeyStatus::Selected {
        return KeyResolution::Resolved(EffectiveKey {
            source: KeySource::Environment,
            value: environment_key.map(str::to_string),
        });
    }
    KeyResolution::NeedsKey
}
