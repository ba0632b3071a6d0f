//! Effect catalogue per model configuration
//!
//! The firmware does not announce which effects a model supports; these lists
//! mirror the options page each configuration serves.

const DEFAULT: &[&str] = &[
    "Vero", "Ignite", "Breathe", "Spectrum", "Embers", "Odyssey", "Aurora", "Red", "Orange",
    "Green", "Blue", "Violet", "White",
];

const EOS_MODELS: &[&str] = &[
    "1800", "ds1030", "hal800", "hal1030", "hal1500", "hal2400", "halev4", "halev8", "irpanel",
    "v630", "v730", "v1030",
];

const ILUSION_MODELS: &[&str] = &["ilusion2", "alisio1150", "alisio1550", "alisio1850", "alisio850"];

const E_SERIES: &[&str] = &["alente", "e1030", "e1250", "e1500", "e1800", "e2400", "e500", "e800"];

const SL_SERIES: &[&str] = &["sl600", "sl700", "sl1000", "sl1250", "sl1500"];

/// Effects available on the model identified by `configs`
pub fn available_for(configs: &str) -> Vec<&'static str> {
    if ILUSION_MODELS.contains(&configs) {
        return vec![
            "Ilusion", "Aurora", "Patriot", "Verona", "Charm", "Viva", "Cocktail", "Campfire",
        ];
    }
    if E_SERIES.contains(&configs) {
        return vec!["Evoflame", "Party"];
    }
    if SL_SERIES.contains(&configs) {
        return vec!["Ignite", "Fiesta"];
    }
    if configs == "video" {
        return vec!["Low", "Medium", "High"];
    }

    let mut effects = DEFAULT.to_vec();
    if EOS_MODELS.contains(&configs) {
        effects.insert(0, "Eos");
    }
    effects
}
