//! Routine definitions: the built-in exercise routine, its short variant,
//! and loading custom routines from TOML.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Cached built-in plan - built once and reused across sessions
static DEFAULT_PLAN: Lazy<RoutinePlan> = Lazy::new(build_default_plan);

/// Get a reference to the cached built-in plan
pub fn default_plan() -> &'static RoutinePlan {
    &DEFAULT_PLAN
}

/// An ordered, non-empty list of exercise steps.
///
/// Immutable once built; a session swaps the whole routine rather than
/// editing it.
#[derive(Clone, Debug, PartialEq)]
pub struct Routine {
    steps: Vec<ExerciseStep>,
}

impl Routine {
    /// Build a routine, rejecting anything that fails [`validate_steps`].
    pub fn new(steps: Vec<ExerciseStep>) -> Result<Self> {
        let errors = validate_steps(&steps);
        if !errors.is_empty() {
            return Err(Error::RoutineValidation(errors.join("; ")));
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[ExerciseStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ExerciseStep> {
        self.steps.get(index)
    }

    /// Step at `index`, clamped to the last step.
    pub fn step(&self, index: usize) -> &ExerciseStep {
        &self.steps[index.min(self.last_index())]
    }

    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    /// Number of forward moves needed to walk the whole routine.
    pub fn total_units(&self) -> u32 {
        self.steps.iter().map(ExerciseStep::unit_count).sum()
    }

    /// Apply per-exercise overrides (matched by name) to a copy of this routine.
    pub fn with_overrides(&self, overrides: &[LengthOverride]) -> Routine {
        let steps = self
            .steps
            .iter()
            .map(|step| match overrides.iter().find(|o| o.name == step.name) {
                Some(o) => o.apply(step),
                None => step.clone(),
            })
            .collect();
        Routine { steps }
    }
}

/// Override applied to one exercise for the short workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LengthOverride {
    pub name: String,
    #[serde(default)]
    pub sets: Option<u32>,
    /// Replaces the magnitude amount, keeping its mode
    #[serde(default)]
    pub amount: Option<u32>,
}

impl LengthOverride {
    fn apply(&self, step: &ExerciseStep) -> ExerciseStep {
        let mut step = step.clone();
        if let Some(sets) = self.sets {
            step.set_count = sets.max(1);
        }
        if let Some(amount) = self.amount {
            step.magnitude = step.magnitude.with_amount(amount.max(1));
        }
        step
    }
}

/// A base routine plus the overrides that derive its short variant
#[derive(Clone, Debug, PartialEq)]
pub struct RoutinePlan {
    pub base: Routine,
    pub short_overrides: Vec<LengthOverride>,
}

impl RoutinePlan {
    /// The routine for the requested workout length.
    pub fn variant(&self, length: WorkoutLength) -> Routine {
        match length {
            WorkoutLength::Long => self.base.clone(),
            WorkoutLength::Short => self.base.with_overrides(&self.short_overrides),
        }
    }

    /// Load a plan from a TOML file with `[[exercise]]` and optional `[[short]]` tables.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let plan = Self::from_toml(&contents)?;
        tracing::info!(
            "Loaded routine with {} exercises from {:?}",
            plan.base.len(),
            path
        );
        Ok(plan)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: RoutineFile = toml::from_str(contents)?;
        let base = Routine::new(file.exercise)?;

        let names: HashSet<&str> = base.steps().iter().map(|s| s.name.as_str()).collect();
        for o in &file.short {
            if !names.contains(o.name.as_str()) {
                return Err(Error::RoutineValidation(format!(
                    "Short override references unknown exercise '{}'",
                    o.name
                )));
            }
        }

        Ok(Self {
            base,
            short_overrides: file.short,
        })
    }
}

/// On-disk routine format
#[derive(Debug, Deserialize)]
struct RoutineFile {
    #[serde(default)]
    exercise: Vec<ExerciseStep>,
    #[serde(default)]
    short: Vec<LengthOverride>,
}

/// Validate a list of steps, returning every problem found
pub fn validate_steps(steps: &[ExerciseStep]) -> Vec<String> {
    let mut errors = Vec::new();

    if steps.is_empty() {
        errors.push("Routine has no exercises".to_string());
    }

    let mut seen = HashSet::new();
    for (i, step) in steps.iter().enumerate() {
        if step.name.trim().is_empty() {
            errors.push(format!("Exercise #{} has empty name", i + 1));
        } else if !seen.insert(step.name.as_str()) {
            errors.push(format!("Duplicate exercise name '{}'", step.name));
        }
        if step.set_count == 0 {
            errors.push(format!("Exercise '{}' has zero sets", step.name));
        }
        if step.magnitude.amount() == 0 {
            errors.push(format!("Exercise '{}' has zero amount", step.name));
        }
        if step.per_side && step.mode() == Mode::Steps {
            errors.push(format!(
                "Exercise '{}': step-counted exercises cannot be per side",
                step.name
            ));
        }
    }

    errors
}

#[allow(clippy::too_many_arguments)]
fn exercise(
    name: &str,
    category: Category,
    sets: u32,
    per_side: bool,
    magnitude: Magnitude,
    purpose: &str,
    instructions: &str,
    image: &str,
) -> ExerciseStep {
    ExerciseStep {
        name: name.into(),
        category,
        set_count: sets,
        per_side,
        magnitude,
        purpose: purpose.into(),
        instructions: instructions.into(),
        image: Some(image.into()),
    }
}

fn short(name: &str, sets: Option<u32>, amount: Option<u32>) -> LengthOverride {
    LengthOverride {
        name: name.into(),
        sets,
        amount,
    }
}

fn build_default_plan() -> RoutinePlan {
    let steps = vec![
        exercise(
            "Wall Calf Stretch",
            Category::Stretch,
            3,
            true,
            Magnitude::Timed { seconds: 30 },
            "Loosen calves and ankles.",
            "Hands on wall, heels down.",
            "assets/ex_wall_calf_stretch.png",
        ),
        exercise(
            "Seated Towel Stretch",
            Category::Stretch,
            3,
            true,
            Magnitude::Timed { seconds: 30 },
            "Stretch the back of the leg.",
            "Sit tall, towel around foot.",
            "assets/ex_seated_towel_stretch.png",
        ),
        exercise(
            "Heel Walking (forwards & backwards)",
            Category::Strength,
            4,
            false,
            Magnitude::Steps { steps: 10 },
            "Build shin strength.",
            "Walk on heels forward then back.",
            "assets/ex_heel_walking.png",
        ),
        exercise(
            "Resistance Band Dorsiflexion",
            Category::Strength,
            3,
            true,
            Magnitude::Reps { reps: 15 },
            "Strengthen the front of the ankle.",
            "Sit down, use the band to pull toes up.",
            "assets/ex_band_dorsiflexion.png",
        ),
        exercise(
            "Mini Squats (heels flat)",
            Category::Strength,
            3,
            false,
            Magnitude::Reps { reps: 10 },
            "Strengthen legs with control.",
            "Slow squat, keep heels down.",
            "assets/ex_mini_squats.png",
        ),
        exercise(
            "Heel-Toe Walk on Tape Line",
            Category::Gait,
            4,
            false,
            Magnitude::Steps { steps: 10 },
            "Practice steady walking.",
            "Heel to toe along the line.",
            "assets/ex_heel_toe_walk.png",
        ),
        exercise(
            "One-Leg Stand (eyes open, heels down)",
            Category::Balance,
            3,
            true,
            Magnitude::Timed { seconds: 30 },
            "Improve balance.",
            "Stand tall, eyes forward.",
            "assets/ex_one_leg_stand.png",
        ),
        exercise(
            "Penguin Walk Game",
            Category::Fun,
            1,
            false,
            Magnitude::Timed { seconds: 180 },
            "Have fun while moving.",
            "Waddle like a penguin!",
            "assets/ex_penguin_walk.png",
        ),
    ];

    let short_overrides = vec![
        short("Wall Calf Stretch", Some(2), None),
        short("Seated Towel Stretch", Some(2), None),
        short("Heel Walking (forwards & backwards)", Some(2), Some(5)),
        short("Resistance Band Dorsiflexion", Some(2), Some(8)),
        short("Mini Squats (heels flat)", Some(2), Some(5)),
        short("Heel-Toe Walk on Tape Line", Some(2), Some(5)),
        short("One-Leg Stand (eyes open, heels down)", Some(2), None),
        short("Penguin Walk Game", None, Some(90)),
    ];

    RoutinePlan {
        base: Routine { steps },
        short_overrides,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routine_validates() {
        let errors = validate_steps(default_plan().base.steps());
        assert!(
            errors.is_empty(),
            "Default routine has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_default_routine_shape() {
        let routine = default_plan().variant(WorkoutLength::Long);
        assert_eq!(routine.len(), 8);
        assert_eq!(routine.step(0).name, "Wall Calf Stretch");
        assert_eq!(routine.step(7).timer_seconds(), Some(180));
        // 6 + 6 + 4 + 6 + 3 + 4 + 6 + 1
        assert_eq!(routine.total_units(), 36);
    }

    #[test]
    fn test_short_variant_applies_overrides() {
        let routine = default_plan().variant(WorkoutLength::Short);
        assert_eq!(routine.len(), 8);

        let heel = routine.step(2);
        assert_eq!(heel.set_count, 2);
        assert_eq!(heel.magnitude, Magnitude::Steps { steps: 5 });

        let band = routine.step(3);
        assert_eq!(band.magnitude, Magnitude::Reps { reps: 8 });
        assert!(band.per_side);

        let penguin = routine.step(7);
        assert_eq!(penguin.set_count, 1);
        assert_eq!(penguin.timer_seconds(), Some(90));
    }

    #[test]
    fn test_step_index_clamps() {
        let routine = default_plan().variant(WorkoutLength::Long);
        assert_eq!(routine.step(99).name, "Penguin Walk Game");
    }

    #[test]
    fn test_empty_routine_rejected() {
        let result = Routine::new(vec![]);
        assert!(matches!(result, Err(Error::RoutineValidation(_))));
    }

    #[test]
    fn test_per_side_steps_rejected() {
        let mut step = default_plan().base.step(2).clone();
        step.per_side = true;
        let errors = validate_steps(&[step]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("cannot be per side"));
    }

    #[test]
    fn test_plan_from_toml() {
        let toml_str = r#"
[[exercise]]
name = "Frog Jumps"
category = "fun"
sets = 2
mode = "reps"
reps = 6

[[exercise]]
name = "Tree Pose"
category = "balance"
sets = 1
per_side = true
mode = "timed"
seconds = 20

[[short]]
name = "Frog Jumps"
sets = 1
"#;
        let plan = RoutinePlan::from_toml(toml_str).unwrap();
        assert_eq!(plan.base.len(), 2);
        assert_eq!(plan.variant(WorkoutLength::Short).step(0).set_count, 1);
        assert_eq!(plan.variant(WorkoutLength::Long).step(0).set_count, 2);
    }

    #[test]
    fn test_plan_rejects_unknown_override() {
        let toml_str = r#"
[[exercise]]
name = "Frog Jumps"
category = "fun"
sets = 2
mode = "reps"
reps = 6

[[short]]
name = "Bear Crawl"
sets = 1
"#;
        let result = RoutinePlan::from_toml(toml_str);
        assert!(matches!(result, Err(Error::RoutineValidation(_))));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("routine.toml");
        std::fs::write(
            &path,
            "[[exercise]]\nname = \"Hop\"\ncategory = \"fun\"\nsets = 1\nmode = \"steps\"\nsteps = 4\n",
        )
        .unwrap();

        let plan = RoutinePlan::load_from(&path).unwrap();
        assert_eq!(plan.base.step(0).magnitude, Magnitude::Steps { steps: 4 });
    }
}
