use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const REGISTRY_VERSION: u32 = 1;
const BUILTIN_REGISTRY: &str = include_str!("../registry/default.toml");
const BUILTIN_ORIGIN: &str = "built-in registry";

/// Sentinel `next` target that ends the wizard instead of naming a step.
pub const COMPLETE_TARGET: &str = "complete";

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(StepId);
string_id!(SectionId);
string_id!(BranchId);

#[derive(Debug, Clone, Deserialize)]
struct RegistrySpec {
    version: u32,
    #[serde(default)]
    sections: Vec<SectionSpec>,
    #[serde(default)]
    branches: Vec<BranchSpec>,
    #[serde(default)]
    steps: Vec<StepSpec>,
    #[serde(default)]
    summary: Vec<SummarySpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct SectionSpec {
    id: String,
    title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct BranchSpec {
    id: String,
    title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct StepSpec {
    id: String,
    section: String,
    title: Option<String>,
    branch: Option<String>,
    next: Option<String>,
    prev: Option<String>,
    #[serde(default)]
    branch_next: BTreeMap<String, String>,
    #[serde(default)]
    branch_prev: BTreeMap<String, String>,
    #[serde(default)]
    fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct FieldSpec {
    name: String,
    label: Option<String>,
    kind: FieldKindSpec,
    #[serde(default)]
    required: bool,
    param: Option<String>,
    options: Option<Vec<OptionSpec>>,
    min: Option<u64>,
    max: Option<u64>,
    step: Option<u64>,
    cap: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum FieldKindSpec {
    Text,
    Email,
    Phone,
    Identifier,
    Currency,
    Choice,
    MultiChoice,
    Slider,
    Consent,
}

#[derive(Debug, Clone, Deserialize)]
struct OptionSpec {
    value: String,
    branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SummarySpec {
    label: String,
    field: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub id: SectionId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub id: BranchId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextTarget {
    Step(StepId),
    Complete,
}

impl NextTarget {
    fn parse(value: &str) -> Self {
        if value == COMPLETE_TARGET {
            Self::Complete
        } else {
            Self::Step(StepId::from(value))
        }
    }
}

/// One screen of the wizard. `ordinal` is its position in authoring order and
/// never changes with the branch selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub id: StepId,
    pub ordinal: usize,
    pub section: SectionId,
    pub title: String,
    pub branch: Option<BranchId>,
    pub next: Option<NextTarget>,
    pub prev: Option<StepId>,
    pub branch_next: BTreeMap<BranchId, StepId>,
    pub branch_prev: BTreeMap<BranchId, StepId>,
    pub fields: Vec<Field>,
}

impl Step {
    /// A per-branch override wins over the plain `next` target.
    pub fn next_for(&self, branch: Option<&BranchId>) -> Option<NextTarget> {
        branch
            .and_then(|branch| self.branch_next.get(branch))
            .map(|id| NextTarget::Step(id.clone()))
            .or_else(|| self.next.clone())
    }

    pub fn prev_for(&self, branch: Option<&BranchId>) -> Option<&StepId> {
        branch
            .and_then(|branch| self.branch_prev.get(branch))
            .or(self.prev.as_ref())
    }

    pub fn is_visible_under(&self, branch: Option<&BranchId>) -> bool {
        match &self.branch {
            None => true,
            Some(tag) => branch == Some(tag),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub param: Option<String>,
    pub kind: FieldKind,
}

impl Field {
    pub fn options(&self) -> &[ChoiceOption] {
        match &self.kind {
            FieldKind::Choice { options } | FieldKind::MultiChoice { options } => options,
            _ => &[],
        }
    }

    pub fn option(&self, value: &str) -> Option<&ChoiceOption> {
        self.options().iter().find(|option| option.value == value)
    }

    /// True for the single choice field whose options select a branch.
    pub fn is_branching(&self) -> bool {
        matches!(&self.kind, FieldKind::Choice { options } if options.iter().any(|option| option.branch.is_some()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Phone,
    Identifier,
    Currency,
    Choice { options: Vec<ChoiceOption> },
    MultiChoice { options: Vec<ChoiceOption> },
    Slider(SliderRange),
    Consent,
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Identifier => "identifier",
            Self::Currency => "currency",
            Self::Choice { .. } => "choice",
            Self::MultiChoice { .. } => "multi-choice",
            Self::Slider(_) => "slider",
            Self::Consent => "consent",
        }
    }

    pub fn is_text_input(&self) -> bool {
        matches!(
            self,
            Self::Text | Self::Email | Self::Phone | Self::Identifier | Self::Currency
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub value: String,
    pub branch: Option<BranchId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliderRange {
    pub min: u64,
    pub max: u64,
    pub step: u64,
    pub cap: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarySource {
    pub label: String,
    pub field: String,
}

/// Validated, immutable step registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRegistry {
    sections: Vec<Section>,
    branches: Vec<Branch>,
    steps: Vec<Step>,
    summary: Vec<SummarySource>,
    branch_point: Option<StepId>,
}

impl StepRegistry {
    pub fn builtin() -> Result<Self, RegistryError> {
        parse_registry(BUILTIN_REGISTRY, BUILTIN_ORIGIN)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.id.as_str() == id)
    }

    pub fn first_step(&self) -> &Step {
        &self.steps[0]
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| section.id.as_str() == id)
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn branch(&self, id: &str) -> Option<&Branch> {
        self.branches.iter().find(|branch| branch.id.as_str() == id)
    }

    pub fn has_branch(&self, id: &BranchId) -> bool {
        self.branches.iter().any(|branch| &branch.id == id)
    }

    /// The step holding the branching choice field, if the registry branches at all.
    pub fn branch_point(&self) -> Option<&StepId> {
        self.branch_point.as_ref()
    }

    pub fn branching_field(&self) -> Option<&Field> {
        self.fields().find(|field| field.is_branching())
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.steps.iter().flat_map(|step| step.fields.iter())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().find(|field| field.name == name)
    }

    pub fn summary_sources(&self) -> &[SummarySource] {
        &self.summary
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse registry at {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to write registry at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("registry already exists at {path}; pass --force to overwrite it")]
    AlreadyExists { path: PathBuf },
    #[error("invalid registry: {message}")]
    Validation { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldParseError {
    MissingOptions,
    UnexpectedOptions,
    EmptyOptionValue,
    DuplicateOptionValue,
    MissingSliderBounds,
    UnexpectedSliderBounds,
    InvertedSliderBounds,
    ZeroSliderStep,
}

pub fn builtin_registry_toml() -> &'static str {
    BUILTIN_REGISTRY
}

pub fn load_registry(path: &Path) -> Result<StepRegistry, RegistryError> {
    let raw = fs::read_to_string(path).map_err(|source| RegistryError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_registry(&raw, &path.display().to_string())
}

pub fn parse_registry(raw: &str, origin: &str) -> Result<StepRegistry, RegistryError> {
    let spec: RegistrySpec = toml::from_str(raw).map_err(|source| RegistryError::Parse {
        origin: origin.to_string(),
        source,
    })?;

    build_registry(spec)
}

pub fn install_builtin_registry(path: &Path, force: bool) -> Result<(), RegistryError> {
    if path.exists() && !force {
        return Err(RegistryError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| RegistryError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    fs::write(path, BUILTIN_REGISTRY).map_err(|source| RegistryError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn invalid(message: impl Into<String>) -> RegistryError {
    RegistryError::Validation {
        message: message.into(),
    }
}

fn parse_field(spec: &FieldSpec) -> Result<FieldKind, FieldParseError> {
    match spec.kind {
        FieldKindSpec::Choice | FieldKindSpec::MultiChoice => {
            if has_slider_bounds(spec) {
                return Err(FieldParseError::UnexpectedSliderBounds);
            }
            let raw_options = spec
                .options
                .as_ref()
                .filter(|options| !options.is_empty())
                .ok_or(FieldParseError::MissingOptions)?;

            let mut seen = BTreeSet::new();
            let mut options = Vec::with_capacity(raw_options.len());
            for option in raw_options {
                if option.value.trim().is_empty() {
                    return Err(FieldParseError::EmptyOptionValue);
                }
                if !seen.insert(option.value.as_str()) {
                    return Err(FieldParseError::DuplicateOptionValue);
                }
                options.push(ChoiceOption {
                    value: option.value.clone(),
                    branch: option.branch.as_deref().map(BranchId::from),
                });
            }

            if spec.kind == FieldKindSpec::Choice {
                Ok(FieldKind::Choice { options })
            } else {
                Ok(FieldKind::MultiChoice { options })
            }
        }
        FieldKindSpec::Slider => {
            if spec.options.is_some() {
                return Err(FieldParseError::UnexpectedOptions);
            }
            let (Some(min), Some(max)) = (spec.min, spec.max) else {
                return Err(FieldParseError::MissingSliderBounds);
            };
            if min > max {
                return Err(FieldParseError::InvertedSliderBounds);
            }
            let step = spec.step.unwrap_or(1);
            if step == 0 {
                return Err(FieldParseError::ZeroSliderStep);
            }
            Ok(FieldKind::Slider(SliderRange {
                min,
                max,
                step,
                cap: spec.cap,
            }))
        }
        FieldKindSpec::Text => plain_field(spec, FieldKind::Text),
        FieldKindSpec::Email => plain_field(spec, FieldKind::Email),
        FieldKindSpec::Phone => plain_field(spec, FieldKind::Phone),
        FieldKindSpec::Identifier => plain_field(spec, FieldKind::Identifier),
        FieldKindSpec::Currency => plain_field(spec, FieldKind::Currency),
        FieldKindSpec::Consent => plain_field(spec, FieldKind::Consent),
    }
}

fn plain_field(spec: &FieldSpec, kind: FieldKind) -> Result<FieldKind, FieldParseError> {
    if spec.options.is_some() {
        return Err(FieldParseError::UnexpectedOptions);
    }
    if has_slider_bounds(spec) {
        return Err(FieldParseError::UnexpectedSliderBounds);
    }
    Ok(kind)
}

fn has_slider_bounds(spec: &FieldSpec) -> bool {
    spec.min.is_some() || spec.max.is_some() || spec.step.is_some() || spec.cap.is_some()
}

fn field_error_message(location: &str, error: FieldParseError) -> String {
    match error {
        FieldParseError::MissingOptions => format!("{location} choice fields require options"),
        FieldParseError::UnexpectedOptions => {
            format!("{location} only choice fields may declare options")
        }
        FieldParseError::EmptyOptionValue => {
            format!("{location} option values must be non-empty")
        }
        FieldParseError::DuplicateOptionValue => {
            format!("{location} option values must be unique")
        }
        FieldParseError::MissingSliderBounds => {
            format!("{location} slider fields require min and max")
        }
        FieldParseError::UnexpectedSliderBounds => {
            format!("{location} only slider fields may declare min/max/step/cap")
        }
        FieldParseError::InvertedSliderBounds => {
            format!("{location} slider min must not exceed max")
        }
        FieldParseError::ZeroSliderStep => format!("{location} slider step must be positive"),
    }
}

fn build_registry(spec: RegistrySpec) -> Result<StepRegistry, RegistryError> {
    if spec.version != REGISTRY_VERSION {
        return Err(invalid("version must be 1"));
    }

    if spec.steps.is_empty() {
        return Err(invalid("at least one step must be declared"));
    }

    let mut sections = Vec::with_capacity(spec.sections.len());
    for (index, section) in spec.sections.iter().enumerate() {
        if section.id.trim().is_empty() {
            return Err(invalid(format!("sections[{index}] id must be non-empty")));
        }
        if sections
            .iter()
            .any(|known: &Section| known.id.as_str() == section.id)
        {
            return Err(invalid(format!(
                "sections[{index}] duplicates id '{}'",
                section.id
            )));
        }
        sections.push(Section {
            id: SectionId::from(section.id.as_str()),
            title: section.title.clone().unwrap_or_else(|| section.id.clone()),
        });
    }

    let mut branches = Vec::with_capacity(spec.branches.len());
    for (index, branch) in spec.branches.iter().enumerate() {
        if branch.id.trim().is_empty() {
            return Err(invalid(format!("branches[{index}] id must be non-empty")));
        }
        if branches
            .iter()
            .any(|known: &Branch| known.id.as_str() == branch.id)
        {
            return Err(invalid(format!(
                "branches[{index}] duplicates id '{}'",
                branch.id
            )));
        }
        branches.push(Branch {
            id: BranchId::from(branch.id.as_str()),
            title: branch.title.clone().unwrap_or_else(|| branch.id.clone()),
        });
    }

    let mut step_ids = BTreeSet::new();
    for (index, step) in spec.steps.iter().enumerate() {
        if step.id.trim().is_empty() {
            return Err(invalid(format!("steps[{index}] id must be non-empty")));
        }
        if step.id == COMPLETE_TARGET {
            return Err(invalid(format!(
                "steps[{index}] id '{COMPLETE_TARGET}' is reserved for the completion target"
            )));
        }
        if !step_ids.insert(step.id.as_str()) {
            return Err(invalid(format!("steps[{index}] duplicates id '{}'", step.id)));
        }
    }

    let branch_declared = |value: &str| branches.iter().any(|branch| branch.id.as_str() == value);

    let mut field_names = BTreeSet::new();
    let mut branch_point: Option<(usize, StepId)> = None;
    let mut steps = Vec::with_capacity(spec.steps.len());

    for (index, step) in spec.steps.iter().enumerate() {
        if !sections
            .iter()
            .any(|section| section.id.as_str() == step.section)
        {
            return Err(invalid(format!(
                "steps[{index}] references undeclared section '{}'",
                step.section
            )));
        }

        if let Some(branch) = &step.branch {
            if !branch_declared(branch) {
                return Err(invalid(format!(
                    "steps[{index}] references undeclared branch '{branch}'"
                )));
            }
            if index == 0 {
                return Err(invalid("steps[0] must not be tagged with a branch"));
            }
        }

        let next = step.next.as_deref().map(NextTarget::parse);
        if let Some(NextTarget::Step(target)) = &next
            && !step_ids.contains(target.as_str())
        {
            return Err(invalid(format!(
                "steps[{index}] next target '{target}' is not a known step"
            )));
        }

        if let Some(prev) = &step.prev
            && !step_ids.contains(prev.as_str())
        {
            return Err(invalid(format!(
                "steps[{index}] prev target '{prev}' is not a known step"
            )));
        }

        let mut branch_next = BTreeMap::new();
        for (branch, target) in &step.branch_next {
            if !branch_declared(branch) {
                return Err(invalid(format!(
                    "steps[{index}] branch_next references undeclared branch '{branch}'"
                )));
            }
            if !step_ids.contains(target.as_str()) {
                return Err(invalid(format!(
                    "steps[{index}] branch_next target '{target}' is not a known step"
                )));
            }
            branch_next.insert(BranchId::from(branch.as_str()), StepId::from(target.as_str()));
        }

        let mut branch_prev = BTreeMap::new();
        for (branch, target) in &step.branch_prev {
            if !branch_declared(branch) {
                return Err(invalid(format!(
                    "steps[{index}] branch_prev references undeclared branch '{branch}'"
                )));
            }
            if !step_ids.contains(target.as_str()) {
                return Err(invalid(format!(
                    "steps[{index}] branch_prev target '{target}' is not a known step"
                )));
            }
            branch_prev.insert(BranchId::from(branch.as_str()), StepId::from(target.as_str()));
        }

        let mut fields = Vec::with_capacity(step.fields.len());
        for (field_index, field_spec) in step.fields.iter().enumerate() {
            let location = format!("steps[{index}].fields[{field_index}]");
            if field_spec.name.trim().is_empty() {
                return Err(invalid(format!("{location} name must be non-empty")));
            }
            if !field_names.insert(field_spec.name.clone()) {
                return Err(invalid(format!(
                    "{location} duplicates field name '{}'",
                    field_spec.name
                )));
            }

            let kind = parse_field(field_spec)
                .map_err(|error| invalid(field_error_message(&location, error)))?;

            let field = Field {
                name: field_spec.name.clone(),
                label: field_spec
                    .label
                    .clone()
                    .unwrap_or_else(|| field_spec.name.clone()),
                required: field_spec.required,
                param: field_spec.param.clone(),
                kind,
            };

            for option in field.options() {
                if let Some(branch) = &option.branch
                    && !branch_declared(branch.as_str())
                {
                    return Err(invalid(format!(
                        "{location} option '{}' references undeclared branch '{branch}'",
                        option.value
                    )));
                }
            }

            if matches!(field.kind, FieldKind::MultiChoice { .. })
                && field.options().iter().any(|option| option.branch.is_some())
            {
                return Err(invalid(format!(
                    "{location} only single-choice fields may select a branch"
                )));
            }

            if field.is_branching() {
                if branch_point.is_some() {
                    return Err(invalid(format!(
                        "{location} is a second branching field; only one is allowed"
                    )));
                }
                if step.branch.is_some() {
                    return Err(invalid(format!(
                        "{location} selects a branch but its step is itself branch-tagged"
                    )));
                }
                branch_point = Some((index, StepId::from(step.id.as_str())));
            }

            fields.push(field);
        }

        steps.push(Step {
            id: StepId::from(step.id.as_str()),
            ordinal: index,
            section: SectionId::from(step.section.as_str()),
            title: step.title.clone().unwrap_or_else(|| step.id.clone()),
            branch: step.branch.as_deref().map(BranchId::from),
            next,
            prev: step.prev.as_deref().map(StepId::from),
            branch_next,
            branch_prev,
            fields,
        });
    }

    if !branches.is_empty() && branch_point.is_none() {
        return Err(invalid(
            "branches are declared but no choice field selects one",
        ));
    }

    if let Some((point, point_id)) = &branch_point {
        for step in &steps {
            if let Some(branch) = &step.branch
                && step.ordinal <= *point
            {
                return Err(invalid(format!(
                    "steps[{}] is tagged with branch '{branch}' but does not come after the branch step '{point_id}'",
                    step.ordinal
                )));
            }
        }
    }

    let mut summary = Vec::with_capacity(spec.summary.len());
    for (index, line) in spec.summary.iter().enumerate() {
        if !field_names.contains(&line.field) {
            return Err(invalid(format!(
                "summary[{index}] references unknown field '{}'",
                line.field
            )));
        }
        summary.push(SummarySource {
            label: line.label.clone(),
            field: line.field.clone(),
        });
    }

    Ok(StepRegistry {
        sections,
        branches,
        steps,
        summary,
        branch_point: branch_point.map(|(_, id)| id),
    })
}
