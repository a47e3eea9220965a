use worx_contracts::credentials::HostKeyStatus;

/// Optional host capability for picking an API key outside the studio.
///
/// A selected key is injected through the environment; the studio never sees
/// its value.
pub trait KeySelector {
    fn has_selected_key(&self) -> anyhow::Result<bool>;
    fn open_select_key(&self) -> anyhow::Result<()>;
}

pub(crate) fn host_status(host: Option<&dyn KeySelector>) -> HostKeyStatus {
    let Some(host) = host else {
        return HostKeyStatus::Unavailable;
    };
    match host.has_selected_key() {
        Ok(true) => HostKeyStatus::Selected,
        Ok(false) => HostKeyStatus::NotSelected,
        Err(err) => {
            tracing::warn!(error = %err, "host key selector query failed");
            HostKeyStatus::NotSelected
        }
    }
}

/// Host backed by the process environment: a key counts as selected when one
/// of the environment key variables is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentKeySelector;

impl EnvironmentKeySelector {
    /// Present only when the environment actually carries a key.
    pub fn detect(environment_key: Option<&str>) -> Option<Self> {
        environment_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|_| Self)
    }
}

impl KeySelector for EnvironmentKeySelector {
    fn has_selected_key(&self) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn open_select_key(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use worx_contracts::credentials::HostKeyStatus;

    use super::{host_status, EnvironmentKeySelector, KeySelector};

    struct BrokenHost;

    impl KeySelector for BrokenHost {
        fn has_selected_key(&self) -> anyhow::Result<bool> {
            anyhow::bail!("bridge unavailable")
        }

        fn open_select_key(&self) -> anyhow::Result<()> {
            anyhow::bail!("bridge unavailable")
        }
    }

    #[test]
    fn absent_host_is_unavailable() {
        assert_eq!(host_status(None), HostKeyStatus::Unavailable);
    }

    #[test]
    fn failing_host_reports_no_selection() {
        assert_eq!(host_status(Some(&BrokenHost)), HostKeyStatus::NotSelected);
    }

    #[test]
    fn environment_host_requires_a_key() {
        assert!(EnvironmentKeySelector::detect(None).is_none());
        assert!(EnvironmentKeySelector::detect(Some(" ")).is_none());
        let host = EnvironmentKeySelector::detect(Some("env-key"));
        assert_eq!(
            host_status(host.as_ref().map(|host| host as &dyn KeySelector)),
            HostKeyStatus::Selected
        );
    }
}
