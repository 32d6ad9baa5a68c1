//! Knobs for one conversion run.

/// How property keys become field identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FieldCase {
    /// Keep the key (sanitized only).
    #[default]
    Preserve,
    Snake,
    Camel,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Name the root type is always bound to.
    pub root_name: String,
    /// Maximum schema nesting depth before resolution gives up on a branch.
    pub max_depth: usize,
    pub field_case: FieldCase,
    /// Module that provides the constraint annotations `annotated_types`
    /// does not cover.
    pub runtime_module: String,
    /// Use a node's `title` as its naming hint.
    pub use_titles: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            root_name: "Model".to_string(),
            max_depth: 64,
            field_case: FieldCase::default(),
            runtime_module: "schema_constraints".to_string(),
            use_titles: true,
        }
    }
}

impl Settings {
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_field_case(mut self, case: FieldCase) -> Self {
        self.field_case = case;
        self
    }

    pub fn with_runtime_module(mut self, module: impl Into<String>) -> Self {
        self.runtime_module = module.into();
        self
    }

    pub fn with_titles(mut self, use_titles: bool) -> Self {
        self.use_titles = use_titles;
        self
    }
}
