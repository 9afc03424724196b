use thiserror::Error;

/// Result type alias for TCO calculations.
pub type Result<T> = std::result::Result<T, TcoError>;

/// Errors surfaced by the calculation engine.
///
/// None of these are fatal: every calculation returns them to the caller
/// instead of producing `NaN` figures.
#[derive(Debug, Error)]
pub enum TcoError {
    /// A required input is missing or outside its valid range.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A reference-data key (GPU model, vendor, fabric, location...) is unknown.
    #[error("unknown {table} '{key}'")]
    Lookup { table: &'static str, key: String },

    /// Inputs that would produce a non-finite result.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl TcoError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        TcoError::Configuration(msg.into())
    }

    pub(crate) fn lookup(table: &'static str, key: impl Into<String>) -> Self {
        TcoError::Lookup {
            table,
            key: key.into(),
        }
    }
}

/// Divides `num` by `den`, reporting a degenerate denominator as an
/// [`TcoError::Arithmetic`] labelled with `what`.
pub(crate) fn checked_div(num: f64, den: f64, what: &str) -> Result<f64> {
    if den == 0.0 || !den.is_finite() {
        return Err(TcoError::Arithmetic(format!("{what}: denominator is zero")));
    }
    let out = num / den;
    if !out.is_finite() {
        return Err(TcoError::Arithmetic(format!("{what}: result is not finite")));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_div_rejects_zero() {
        assert!(checked_div(1.0, 0.0, "x").is_err());
        assert!((checked_div(6.0, 3.0, "x").unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn lookup_message_names_table_and_key() {
        let e = TcoError::lookup("GPU model", "z100");
        assert_eq!(e.to_string(), "unknown GPU model 'z100'");
    }
}
