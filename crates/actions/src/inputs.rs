//! Action inputs read from `INPUT_*` variables.

use pipeline::InputSource;

use crate::Environment;

/// Name of the variable holding input `name`: `INPUT_` followed by the name
/// upper-cased with spaces replaced by underscores. Hyphens are kept.
pub fn input_variable(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

/// [`InputSource`] over `INPUT_*` variables.
#[derive(Debug, Clone, Copy)]
pub struct EnvInputs<'a> {
    env: &'a Environment,
}

impl<'a> EnvInputs<'a> {
    /// Creates an input source over `env`.
    pub fn new(env: &'a Environment) -> Self {
        Self { env }
    }
}

impl InputSource for EnvInputs<'_> {
    fn raw(&self, name: &str) -> Option<String> {
        self.env.get(&input_variable(name)).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::InputReader;

    #[test]
    fn variable_names_follow_runtime_convention() {
        assert_eq!(input_variable("posthog-token"), "INPUT_POSTHOG-TOKEN");
        assert_eq!(input_variable("my input"), "INPUT_MY_INPUT");
    }

    #[test]
    fn inputs_are_read_from_the_snapshot() {
        let env = Environment::from_pairs([
            ("INPUT_EVENT", "  ci-run  "),
            ("INPUT_CAPTURE-RUN-DURATION", "true"),
        ]);
        let inputs = env.inputs();
        let reader = InputReader::new(&inputs);

        assert_eq!(reader.read("event"), "ci-run");
        assert!(reader.read_bool("capture-run-duration"));
        assert_eq!(reader.read("runner"), "");
    }
}
