use crate::domain::models::AppSettings;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::{KeyValueStore, SETTINGS_KEY};
use std::sync::Arc;

/// Sole owner of the settings blob, pomodoro durations included.
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
    settings: AppSettings,
}

impl SettingsStore {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, InfraError> {
        let settings = read_settings(store.as_ref())?;
        Ok(Self { store, settings })
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn reload(&mut self) -> Result<(), InfraError> {
        self.settings = read_settings(self.store.as_ref())?;
        Ok(())
    }

    /// Replaces the settings and returns the previous value.
    pub fn update(&mut self, settings: AppSettings) -> Result<AppSettings, InfraError> {
        settings.validate().map_err(InfraError::InvalidInput)?;
        let payload = serde_json::to_string(&settings)?;
        self.store.set(SETTINGS_KEY, &payload)?;
        Ok(std::mem::replace(&mut self.settings, settings))
    }

    pub fn reset_to_defaults(&mut self) -> Result<AppSettings, InfraError> {
        self.update(AppSettings::default())
    }
}

fn read_settings(store: &dyn KeyValueStore) -> Result<AppSettings, InfraError> {
    let Some(raw) = store.get(SETTINGS_KEY)? else {
        return Ok(AppSettings::default());
    };
    let parsed = serde_json::from_str::<AppSettings>(&raw)
        .map_err(|error| error.to_string())
        .and_then(|settings| settings.validate().map(|_| settings));
    match parsed {
        Ok(settings) => Ok(settings),
        Err(error) => {
            tracing::warn!(key = SETTINGS_KEY, error = %error, "falling back to default settings");
            Ok(AppSettings::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Theme;
    use crate::infrastructure::storage::InMemoryKeyValueStore;

    #[test]
    fn missing_blob_yields_defaults() {
        let store = SettingsStore::load(Arc::new(InMemoryKeyValueStore::default())).expect("load");
        assert_eq!(store.settings(), &AppSettings::default());
    }

    #[test]
    fn update_persists_and_returns_previous() {
        let backing = Arc::new(InMemoryKeyValueStore::default());
        let mut store = SettingsStore::load(backing.clone()).expect("load");
        let mut next = AppSettings::default();
        next.work_time = 45;
        next.theme = Theme::Light;

        let previous = store.update(next.clone()).expect("update");
        assert_eq!(previous.work_time, 25);
        assert_eq!(store.settings().work_time, 45);

        let reloaded = SettingsStore::load(backing).expect("reload");
        assert_eq!(reloaded.settings(), &next);
    }

    #[test]
    fn invalid_update_is_rejected_and_not_persisted() {
        let backing = Arc::new(InMemoryKeyValueStore::default());
        let mut store = SettingsStore::load(backing.clone()).expect("load");
        let mut invalid = AppSettings::default();
        invalid.long_break = 0;
        assert!(matches!(store.update(invalid), Err(InfraError::InvalidInput(_))));
        assert_eq!(backing.get(SETTINGS_KEY).expect("get"), None);
    }

    #[test]
    fn corrupt_or_invalid_blob_falls_back_to_defaults() {
        let backing = Arc::new(InMemoryKeyValueStore::default());
        backing.set(SETTINGS_KEY, "[1, 2]").expect("seed");
        let store = SettingsStore::load(backing.clone()).expect("load");
        assert_eq!(store.settings(), &AppSettings::default());

        backing.set(SETTINGS_KEY, r#"{"workTime": 0}"#).expect("seed");
        let store = SettingsStore::load(backing).expect("load");
        assert_eq!(store.settings().work_time, 25);
    }

    #[test]
    fn reset_restores_defaults() {
        let backing = Arc::new(InMemoryKeyValueStore::default());
        backing.set(SETTINGS_KEY, r#"{"userName": "Ada"}"#).expect("seed");
        let mut store = SettingsStore::load(backing).expect("load");
        assert_eq!(store.settings().user_name, "Ada");
        store.reset_to_defaults().expect("reset");
        assert_eq!(store.settings().user_name, "Student");
    }
}
