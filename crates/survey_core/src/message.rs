use shared::domain::Feature;

/// One row of a feature catalog: the deactivation name a question may list,
/// and the wording shown to the participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureDescriptor {
    pub name: &'static str,
    pub description: &'static str,
}

/// Catalog shown alongside the population view.
pub const POPULATION_FEATURES: [FeatureDescriptor; 3] = [
    FeatureDescriptor {
        name: "tooltip",
        description: "infotips",
    },
    FeatureDescriptor {
        name: "highlight",
        description: "parallel highlighting",
    },
    FeatureDescriptor {
        name: "switching",
        description: "map switching",
    },
];

/// Catalog shown alongside the paired cartogram view. The highlight row is
/// registered under `highlighting` here, unlike the population catalog, so a
/// `deactivate: ["highlight"]` entry leaves it enabled.
pub const CARTOGRAM_FEATURES: [FeatureDescriptor; 3] = [
    FeatureDescriptor {
        name: "tooltip",
        description: "infotips",
    },
    FeatureDescriptor {
        name: "highlighting",
        description: "parallel highlighting",
    },
    FeatureDescriptor {
        name: "switching",
        description: "map switching",
    },
];

/// Renders the "You have access to ..." sentence for the features that
/// survive the deactivation set, in catalog order. The serial comma appears
/// from three items up and is suppressed at exactly two.
pub fn interactivity_message(features: &[FeatureDescriptor], deactivated: &[Feature]) -> String {
    let enabled: Vec<&str> = features
        .iter()
        .filter(|feature| !deactivated.iter().any(|d| d.as_str() == feature.name))
        .map(|feature| feature.description)
        .collect();

    match enabled.as_slice() {
        [] => "You have access to no interactive features.".to_string(),
        [only] => format!("You have access to the {only} feature."),
        [first, second] => format!("You have access to the {first} and {second} features."),
        [init @ .., last] => format!(
            "You have access to the {}, and {last} features.",
            init.join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_enabled_features() {
        let message = interactivity_message(
            &POPULATION_FEATURES,
            &[Feature::Tooltip, Feature::Highlight, Feature::Switching],
        );
        assert_eq!(message, "You have access to no interactive features.");
    }

    #[test]
    fn one_enabled_feature_is_singular() {
        let message = interactivity_message(
            &POPULATION_FEATURES,
            &[Feature::Highlight, Feature::Switching],
        );
        assert_eq!(message, "You have access to the infotips feature.");
    }

    #[test]
    fn two_enabled_features_join_without_a_comma() {
        let message = interactivity_message(&POPULATION_FEATURES, &[Feature::Tooltip]);
        assert_eq!(
            message,
            "You have access to the parallel highlighting and map switching features."
        );
    }

    #[test]
    fn three_enabled_features_keep_the_serial_comma() {
        let message = interactivity_message(&POPULATION_FEATURES, &[]);
        assert_eq!(
            message,
            "You have access to the infotips, parallel highlighting, and map switching features."
        );
    }

    #[test]
    fn cartogram_catalog_ignores_the_highlight_deactivation_name() {
        let message = interactivity_message(&CARTOGRAM_FEATURES, &[Feature::Highlight]);
        assert_eq!(
            message,
            "You have access to the infotips, parallel highlighting, and map switching features."
        );
    }
}
