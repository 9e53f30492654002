use std::borrow::Cow;

/// Construction options for a store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    label: Cow<'static, str>,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name used for this store in log events and `Debug` output.
    pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn into_label(self) -> Cow<'static, str> {
        self.label
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            label: Cow::Borrowed("store"),
        }
    }
}
