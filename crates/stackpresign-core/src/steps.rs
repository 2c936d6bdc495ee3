use crate::CoreError;

type StepFn<C> = Box<dyn Fn(&mut C) -> Result<(), CoreError>>;

struct Step<C> {
    stage: u32,
    name: String,
    run: StepFn<C>,
}

/// Named steps grouped into numbered stages, run in a fixed order.
///
/// Steps run by ascending stage, and in registration order within a stage.
/// Every step receives the same mutable context.
pub struct StepRegistry<C> {
    steps: Vec<Step<C>>,
}

impl<C> Default for StepRegistry<C> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<C> StepRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        stage: u32,
        name: &str,
        run: impl Fn(&mut C) -> Result<(), CoreError> + 'static,
    ) -> Result<(), CoreError> {
        if self.steps.iter().any(|s| s.name == name) {
            return Err(CoreError::DuplicateStep(name.to_owned()));
        }
        self.steps.push(Step {
            stage,
            name: name.to_owned(),
            run: Box::new(run),
        });
        // Stable: keeps registration order within a stage.
        self.steps.sort_by_key(|s| s.stage);
        Ok(())
    }

    /// `(stage, name)` for every step, in run order.
    pub fn steps(&self) -> Vec<(u32, &str)> {
        self.steps
            .iter()
            .map(|s| (s.stage, s.name.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step with `stage <= target_stage`. Returns how many ran.
    ///
    /// The first failure aborts the run; later steps are not executed.
    pub fn run_through(&self, ctx: &mut C, target_stage: u32) -> Result<usize, CoreError> {
        let mut ran = 0;
        for step in self.steps.iter().take_while(|s| s.stage <= target_stage) {
            tracing::info!("stage {}: {}", step.stage, step.name);
            (step.run)(ctx).map_err(|e| CoreError::Step {
                stage: step.stage,
                name: step.name.clone(),
                source: Box::new(e),
            })?;
            ran += 1;
        }
        Ok(ran)
    }
}
