//! Step-navigation state machine.
//!
//! The controller owns the branch selection and two positions into the visible
//! sequence: where the user is (`current`) and the furthest point reached
//! (`furthest`). The visible sequence itself is always derived from the registry
//! and the branch, so it can never drift from either.

use std::collections::BTreeMap;

use tracing::debug;

use crate::registry::{BranchId, NextTarget, SectionId, Step, StepId, StepRegistry};

/// Steps visible under one branch selection, in ordinal order.
#[derive(Debug, Clone)]
pub struct VisibleSequence<'a> {
    steps: Vec<&'a Step>,
}

impl<'a> VisibleSequence<'a> {
    pub fn derive(registry: &'a StepRegistry, branch: Option<&BranchId>) -> Self {
        Self {
            steps: registry
                .steps()
                .iter()
                .filter(|step| step.is_visible_under(branch))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&'a Step> {
        self.steps.get(index).copied()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.id.as_str() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Step> + '_ {
        self.steps.iter().copied()
    }

    pub fn first_in_section(&self, section: &SectionId) -> Option<&'a Step> {
        self.iter().find(|step| &step.section == section)
    }

    /// `{min, max}` index bounds for every section present in this sequence.
    pub fn section_bounds(&self) -> BTreeMap<&'a SectionId, SectionBounds> {
        let mut bounds = BTreeMap::<&SectionId, SectionBounds>::new();
        for (index, step) in self.steps.iter().enumerate() {
            bounds
                .entry(&step.section)
                .and_modify(|entry| entry.max = index)
                .or_insert(SectionBounds {
                    min: index,
                    max: index,
                });
        }
        bounds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionBounds {
    pub min: usize,
    pub max: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    Active,
    Complete,
    Inactive,
}

impl SectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Complete => "complete",
            Self::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionStatus {
    pub section: SectionId,
    pub title: String,
    pub state: SectionState,
    /// `None` when no step of the section is visible under the current branch.
    pub bounds: Option<SectionBounds>,
}

impl SectionStatus {
    pub fn is_visible(&self) -> bool {
        self.bounds.is_some()
    }
}

/// Read-only view model handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardView {
    pub active_step: StepId,
    pub sections: Vec<SectionStatus>,
    pub progress_percent: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationRejection {
    UnknownStep,
    HiddenByBranch,
    NoTarget,
    UnknownSection,
    SectionNotComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved { from: usize, to: usize },
    Rejected(NavigationRejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved { from: usize, to: usize },
    /// The step's next target is the completion sentinel.
    Complete,
    Rejected(NavigationRejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchChange {
    Unchanged,
    UnknownBranch,
    Applied { rolled_back: bool },
}

#[derive(Debug, Clone)]
pub struct WizardController {
    registry: StepRegistry,
    branch: Option<BranchId>,
    current: usize,
    furthest: usize,
}

impl WizardController {
    pub fn new(registry: StepRegistry) -> Self {
        Self {
            registry,
            branch: None,
            current: 0,
            furthest: 0,
        }
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn branch(&self) -> Option<&BranchId> {
        self.branch.as_ref()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn furthest_index(&self) -> usize {
        self.furthest
    }

    pub fn visible(&self) -> VisibleSequence<'_> {
        VisibleSequence::derive(&self.registry, self.branch.as_ref())
    }

    pub fn current_step(&self) -> &Step {
        self.visible()
            .step(self.current)
            .unwrap_or_else(|| self.registry.first_step())
    }

    pub fn select_branch(&mut self, branch: Option<&BranchId>) -> BranchChange {
        if self.branch.as_ref() == branch {
            return BranchChange::Unchanged;
        }

        if let Some(candidate) = branch
            && !self.registry.has_branch(candidate)
        {
            debug!(branch = %candidate, "ignoring undeclared branch");
            return BranchChange::UnknownBranch;
        }

        let (current_id, furthest_id) = {
            let visible = self.visible();
            (
                visible.step(self.current).map(|step| step.id.clone()),
                visible.step(self.furthest).map(|step| step.id.clone()),
            )
        };
        let switched = self.branch.is_some();
        let previous = std::mem::replace(&mut self.branch, branch.cloned());

        let visible = self.visible();
        let anchor = self
            .registry
            .branch_point()
            .and_then(|id| visible.position(id.as_str()))
            .unwrap_or(0);
        let remapped_furthest = furthest_id
            .and_then(|id| visible.position(id.as_str()))
            .unwrap_or(anchor);

        // Steps that just became visible ahead of `furthest` were never reached.
        let skipped_new_steps = visible
            .iter()
            .take(remapped_furthest)
            .any(|step| !step.is_visible_under(previous.as_ref()));
        let rolled_back = switched || skipped_new_steps;

        let furthest = if rolled_back {
            anchor.min(remapped_furthest)
        } else {
            remapped_furthest
        };
        let current = current_id
            .and_then(|id| visible.position(id.as_str()))
            .filter(|index| !rolled_back || *index <= furthest)
            .unwrap_or(furthest);

        self.current = current;
        self.furthest = furthest.max(current);

        debug!(
            from = previous.as_ref().map(BranchId::as_str),
            to = branch.map(BranchId::as_str),
            rolled_back,
            current = self.current,
            furthest = self.furthest,
            "branch selection changed"
        );

        BranchChange::Applied { rolled_back }
    }

    pub fn go_to_step(&mut self, id: &str) -> Navigation {
        if self.registry.step(id).is_none() {
            debug!(step = id, "rejecting navigation to unknown step");
            return Navigation::Rejected(NavigationRejection::UnknownStep);
        }

        let Some(index) = self.visible().position(id) else {
            debug!(step = id, "rejecting navigation to step hidden by branch");
            return Navigation::Rejected(NavigationRejection::HiddenByBranch);
        };

        let from = self.current;
        self.current = index;
        self.furthest = self.furthest.max(index);
        Navigation::Moved { from, to: index }
    }

    pub fn advance(&mut self) -> Advance {
        let target = self.current_step().next_for(self.branch.as_ref());
        match target {
            None => Advance::Rejected(NavigationRejection::NoTarget),
            Some(NextTarget::Complete) => Advance::Complete,
            Some(NextTarget::Step(id)) => match self.go_to_step(id.as_str()) {
                Navigation::Moved { from, to } => Advance::Moved { from, to },
                Navigation::Rejected(reason) => Advance::Rejected(reason),
            },
        }
    }

    pub fn retreat(&mut self) -> Navigation {
        let Some(target) = self
            .current_step()
            .prev_for(self.branch.as_ref())
            .cloned()
        else {
            return Navigation::Rejected(NavigationRejection::NoTarget);
        };
        self.go_to_step(target.as_str())
    }

    /// Section jumping only reaches sections the user has already moved past.
    pub fn pick_section(&mut self, section: &str) -> Navigation {
        let Some(declared) = self.registry.section(section) else {
            return Navigation::Rejected(NavigationRejection::UnknownSection);
        };
        let section_id = declared.id.clone();

        if self.section_state(&section_id) != SectionState::Complete {
            debug!(section, "rejecting jump to section that is not complete");
            return Navigation::Rejected(NavigationRejection::SectionNotComplete);
        }

        let Some(first) = self
            .visible()
            .first_in_section(&section_id)
            .map(|step| step.id.clone())
        else {
            return Navigation::Rejected(NavigationRejection::SectionNotComplete);
        };
        self.go_to_step(first.as_str())
    }

    pub fn section_state(&self, section: &SectionId) -> SectionState {
        let visible = self.visible();
        let bounds = visible.section_bounds();
        self.state_for(section, bounds.get(section).copied(), &visible)
    }

    pub fn section_statuses(&self) -> Vec<SectionStatus> {
        let visible = self.visible();
        let bounds = visible.section_bounds();

        self.registry
            .sections()
            .iter()
            .map(|section| {
                let section_bounds = bounds.get(&section.id).copied();
                SectionStatus {
                    section: section.id.clone(),
                    title: section.title.clone(),
                    state: self.state_for(&section.id, section_bounds, &visible),
                    bounds: section_bounds,
                }
            })
            .collect()
    }

    fn state_for(
        &self,
        section: &SectionId,
        bounds: Option<SectionBounds>,
        visible: &VisibleSequence<'_>,
    ) -> SectionState {
        let Some(bounds) = bounds else {
            return SectionState::Inactive;
        };

        let active = visible
            .step(self.current)
            .is_some_and(|step| &step.section == section);
        if active {
            SectionState::Active
        } else if bounds.max < self.furthest {
            SectionState::Complete
        } else {
            SectionState::Inactive
        }
    }

    pub fn progress_percent(&self) -> u8 {
        progress_percent(self.current, self.visible().len())
    }

    pub fn view(&self) -> WizardView {
        WizardView {
            active_step: self.current_step().id.clone(),
            sections: self.section_statuses(),
            progress_percent: self.progress_percent(),
        }
    }
}

/// `round((current + 1) / total * 100)`, rounding halves up, clamped to 0..=100.
pub fn progress_percent(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let scaled = ((current + 1) * 200 + total) / (2 * total);
    scaled.min(100) as u8
}
