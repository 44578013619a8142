//! Vendor lead-notification parsers.
//!
//! Some inbound emails are not conversations but lead notifications sent by a
//! lead vendor. Each vendor template is handled by a [`LeadParser`]; the
//! [`LeadParserRegistry`] tries them in turn and the first match wins.

use crate::core::errors::LeadParseError;
use crate::infrastructure::entities::ProspectData;
use di::{inject, injectable};
use log::debug;
use std::sync::Arc;

pub trait LeadParser: Send + Sync {
    /// Stamped into `lead_vendor` of every lead the registry accepts.
    fn vendor(&self) -> &'static str;

    /// Extracts the lead from the plain-text body. Never returns partial data.
    fn parse(&self, text: &str) -> Result<ProspectData, LeadParseError>;
}

/// Where a field's value sits: after `start` and before `end`, with one
/// delimiter character dropped on each side.
struct Field {
    start: &'static str,
    end: &'static str,
    assign: Option<fn(&mut ProspectData, String)>,
}

const QUOTE_WIZARD_DISCLAIMER: &str =
    "*Please do not respond to this email.Leads are sent from an unmonitored";
const QUOTE_WIZARD_SECTION_START: &str = "Contact Information";
const QUOTE_WIZARD_SECTION_END: &str = "Custom Lead Type Name : Exclusive";

const QUOTE_WIZARD_FIELDS: &[Field] = &[
    Field {
        start: "NAME",
        end: "EMAIL",
        assign: Some(|lead, value| lead.name = value),
    },
    Field {
        start: "EMAIL",
        end: "ADDRESS",
        assign: Some(|lead, value| lead.email = value.to_lowercase()),
    },
    Field {
        start: "ADDRESS",
        end: "PHONE",
        assign: Some(|lead, value| lead.street = value),
    },
    Field {
        start: "PHONE",
        end: "CITY / STATE / ZIP",
        assign: Some(|lead, value| lead.phone = value),
    },
    Field {
        start: "CITY / STATE / ZIP",
        end: "Health Details",
        assign: Some(|lead, value| lead.location = value),
    },
    Field {
        start: "DATE OF BIRTH",
        end: "GENDER",
        assign: Some(|lead, value| lead.birth = value),
    },
    Field {
        start: "GENDER",
        end: "Coverage",
        assign: Some(|lead, value| lead.gender = value),
    },
    // Required by the template but not kept on the prospect.
    Field {
        start: "COVERAGE TYPE",
        end: "IS MEDICARE",
        assign: None,
    },
];

/// Lead notifications from Quote Wizard.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuoteWizardParser;

impl QuoteWizardParser {
    const VENDOR: &'static str = "Quote Wizard";

    fn not_a_lead(missing: &'static str) -> LeadParseError {
        debug!("quote wizard: {missing} not found");
        LeadParseError::NotALeadEmail {
            vendor: Self::VENDOR,
            missing,
        }
    }
}

impl LeadParser for QuoteWizardParser {
    fn vendor(&self) -> &'static str {
        Self::VENDOR
    }

    fn parse(&self, text: &str) -> Result<ProspectData, LeadParseError> {
        if !text.contains(QUOTE_WIZARD_DISCLAIMER) {
            return Err(Self::not_a_lead("disclaimer"));
        }

        let from = text
            .find(QUOTE_WIZARD_SECTION_START)
            .ok_or_else(|| Self::not_a_lead(QUOTE_WIZARD_SECTION_START))?;
        let to = text
            .find(QUOTE_WIZARD_SECTION_END)
            .ok_or_else(|| Self::not_a_lead(QUOTE_WIZARD_SECTION_END))?;
        let section = drop_last_char(text.get(from..to).unwrap_or_default());

        let mut lead = ProspectData::default();
        for field in QUOTE_WIZARD_FIELDS {
            let value = extract_between(section, field.start, field.end)
                .ok_or_else(|| Self::not_a_lead(field.start))?;
            if let Some(assign) = field.assign {
                assign(&mut lead, value.trim().to_owned());
            }
        }

        Ok(lead)
    }
}

/// Returns the text between the `start` and `end` markers, minus the
/// delimiter right after `start` and the one right before `end`. An `end`
/// that occurs before `start` yields an empty value.
fn extract_between<'a>(section: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let start_at = section.find(start)?;
    let end_at = section.find(end)?;

    let value_start = skip_one_char(section, start_at + start.len());
    let value_end = drop_last_char(&section[..end_at]).len();

    Some(section.get(value_start..value_end).unwrap_or_default())
}

fn skip_one_char(text: &str, at: usize) -> usize {
    text[at..].chars().next().map_or(at, |c| at + c.len_utf8())
}

fn drop_last_char(text: &str) -> &str {
    match text.char_indices().next_back() {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// The set of known lead vendors, tried in registration order.
#[derive(Clone)]
pub struct LeadParserRegistry {
    parsers: Vec<Arc<dyn LeadParser>>,
}

#[injectable]
impl LeadParserRegistry {
    #[inject]
    pub fn create() -> LeadParserRegistry {
        LeadParserRegistry::new(vec![Arc::new(QuoteWizardParser)])
    }
}

impl LeadParserRegistry {
    pub fn new(parsers: Vec<Arc<dyn LeadParser>>) -> LeadParserRegistry {
        LeadParserRegistry { parsers }
    }

    /// Returns the first vendor's lead found in `text`, if any.
    pub fn parse(&self, text: &str) -> Option<ProspectData> {
        self.parsers
            .iter()
            .find_map(|parser| match parser.parse(text) {
                Ok(lead) => Some(ProspectData {
                    lead_vendor: parser.vendor().to_owned(),
                    ..lead
                }),
                Err(e) => {
                    debug!("{} parser skipped email: {e}", parser.vendor());
                    None
                }
            })
    }
}
