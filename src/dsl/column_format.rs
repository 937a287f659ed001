use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Rendering strategy for one column of a report.
///
/// In YAML a format is either a bare name (`badge`) or a single-key map
/// carrying options (`link: { href: /explorer?database=[database] }`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawColumnFormat", into = "RawColumnFormat")]
pub enum ColumnFormat {
    #[default]
    Text,
    Number,
    NumberShort,
    ReadableSize,
    Duration,
    Badge,
    ColoredBadge,
    BackgroundBar,
    Boolean,
    Code,
    CodeDialog,
    RelatedTime,
    Link {
        href: String,
    },
}

impl ColumnFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnFormat::Text => "text",
            ColumnFormat::Number => "number",
            ColumnFormat::NumberShort => "number_short",
            ColumnFormat::ReadableSize => "readable_size",
            ColumnFormat::Duration => "duration",
            ColumnFormat::Badge => "badge",
            ColumnFormat::ColoredBadge => "colored_badge",
            ColumnFormat::BackgroundBar => "background_bar",
            ColumnFormat::Boolean => "boolean",
            ColumnFormat::Code => "code",
            ColumnFormat::CodeDialog => "code_dialog",
            ColumnFormat::RelatedTime => "related_time",
            ColumnFormat::Link { .. } => "link",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        let format = match name {
            "text" => ColumnFormat::Text,
            "number" => ColumnFormat::Number,
            "number_short" => ColumnFormat::NumberShort,
            "readable_size" => ColumnFormat::ReadableSize,
            "duration" => ColumnFormat::Duration,
            "badge" => ColumnFormat::Badge,
            "colored_badge" => ColumnFormat::ColoredBadge,
            "background_bar" => ColumnFormat::BackgroundBar,
            "boolean" => ColumnFormat::Boolean,
            "code" => ColumnFormat::Code,
            "code_dialog" => ColumnFormat::CodeDialog,
            "related_time" => ColumnFormat::RelatedTime,
            _ => return None,
        };
        Some(format)
    }

    /// Numeric formats right-align their cells.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnFormat::Number
                | ColumnFormat::NumberShort
                | ColumnFormat::ReadableSize
                | ColumnFormat::Duration
                | ColumnFormat::BackgroundBar
        )
    }
}

impl fmt::Display for ColumnFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FormatOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    href: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawColumnFormat {
    Name(String),
    WithOptions(BTreeMap<String, FormatOptions>),
}

impl TryFrom<RawColumnFormat> for ColumnFormat {
    type Error = String;

    fn try_from(raw: RawColumnFormat) -> Result<Self, Self::Error> {
        match raw {
            RawColumnFormat::Name(name) => ColumnFormat::from_name(&name).ok_or_else(|| {
                if name == "link" {
                    "link format requires an 'href' option".to_string()
                } else {
                    format!("unknown column format '{}'", name)
                }
            }),
            RawColumnFormat::WithOptions(map) => {
                if map.len() != 1 {
                    return Err(format!(
                        "column format map must have exactly one key, got {}",
                        map.len()
                    ));
                }
                let (name, options) = map
                    .into_iter()
                    .next()
                    .ok_or_else(|| "empty column format map".to_string())?;
                match name.as_str() {
                    "link" => {
                        let href = options
                            .href
                            .ok_or_else(|| "link format requires an 'href' option".to_string())?;
                        Ok(ColumnFormat::Link { href })
                    }
                    other => ColumnFormat::from_name(other)
                        .ok_or_else(|| format!("unknown column format '{}'", other)),
                }
            }
        }
    }
}

impl From<ColumnFormat> for RawColumnFormat {
    fn from(format: ColumnFormat) -> Self {
        match format {
            ColumnFormat::Link { href } => RawColumnFormat::WithOptions(BTreeMap::from([(
                "link".to_string(),
                FormatOptions { href: Some(href) },
            )])),
            other => RawColumnFormat::Name(other.name().to_string()),
        }
    }
}
