// src/extract/rules.rs
use anyhow::{anyhow, bail, Context, Result};
use crate::text::element_text;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Every field a detail page can contribute to a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Description,
    Location,
    PostedAt,
    Salary,
    Availability,
    EmploymentTypes,
    Education,
    Qualification,
    Experience,
    ExperienceEntries,
    Skills,
    AdditionalSkills,
    Languages,
    Mobility,
}

impl Field {
    pub const ALL: [Field; 15] = [
        Field::Title,
        Field::Description,
        Field::Location,
        Field::PostedAt,
        Field::Salary,
        Field::Availability,
        Field::EmploymentTypes,
        Field::Education,
        Field::Qualification,
        Field::Experience,
        Field::ExperienceEntries,
        Field::Skills,
        Field::AdditionalSkills,
        Field::Languages,
        Field::Mobility,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Location => "location",
            Field::PostedAt => "posted_at",
            Field::Salary => "salary",
            Field::Availability => "availability",
            Field::EmploymentTypes => "employment_types",
            Field::Education => "education",
            Field::Qualification => "qualification",
            Field::Experience => "experience",
            Field::ExperienceEntries => "experience_entries",
            Field::Skills => "skills",
            Field::AdditionalSkills => "additional_skills",
            Field::Languages => "languages",
            Field::Mobility => "mobility",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declarative form of a rule, as written in presets and config files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSpec {
    /// Text of the first match.
    Text { selector: String },
    /// Attribute of the first match.
    Attr { selector: String, attr: String },
    /// Text of every match.
    List { selector: String },
    /// Text of the element right after the first match.
    NextSibling { selector: String },
    /// Text of `value` inside the first `item` whose text contains `label`.
    Labeled {
        item: String,
        label: String,
        value: String,
    },
    /// One entry per `item`: the text of `first` and of `second` inside it.
    /// Without a `first` match the item's own text stands in; a missing
    /// `second` is left empty.
    Pairs {
        item: String,
        first: String,
        second: String,
    },
}

impl RuleSpec {
    pub fn text(selector: &str) -> Self {
        RuleSpec::Text {
            selector: selector.to_string(),
        }
    }

    pub fn attr(selector: &str, attr: &str) -> Self {
        RuleSpec::Attr {
            selector: selector.to_string(),
            attr: attr.to_string(),
        }
    }

    pub fn list(selector: &str) -> Self {
        RuleSpec::List {
            selector: selector.to_string(),
        }
    }

    pub fn next_sibling(selector: &str) -> Self {
        RuleSpec::NextSibling {
            selector: selector.to_string(),
        }
    }

    pub fn labeled(item: &str, label: &str, value: &str) -> Self {
        RuleSpec::Labeled {
            item: item.to_string(),
            label: label.to_string(),
            value: value.to_string(),
        }
    }

    pub fn pairs(item: &str, first: &str, second: &str) -> Self {
        RuleSpec::Pairs {
            item: item.to_string(),
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    pub fn compile(&self) -> Result<Rule> {
        Ok(match self {
            RuleSpec::Text { selector } => Rule::Text(parse_selector(selector)?),
            RuleSpec::Attr { selector, attr } => Rule::Attr {
                selector: parse_selector(selector)?,
                attr: attr.clone(),
            },
            RuleSpec::List { selector } => Rule::List(parse_selector(selector)?),
            RuleSpec::NextSibling { selector } => Rule::NextSibling(parse_selector(selector)?),
            RuleSpec::Labeled { item, label, value } => Rule::Labeled {
                item: parse_selector(item)?,
                label: label.clone(),
                value: parse_selector(value)?,
            },
            RuleSpec::Pairs {
                item,
                first,
                second,
            } => Rule::Pairs {
                item: parse_selector(item)?,
                first: parse_selector(first)?,
                second: parse_selector(second)?,
            },
        })
    }
}

/// A compiled rule, selectors already validated.
#[derive(Debug, Clone)]
pub enum Rule {
    Text(Selector),
    Attr { selector: Selector, attr: String },
    List(Selector),
    NextSibling(Selector),
    Labeled {
        item: Selector,
        label: String,
        value: Selector,
    },
    Pairs {
        item: Selector,
        first: Selector,
        second: Selector,
    },
}

impl Rule {
    fn apply(&self, document: &Html) -> Option<FieldValue> {
        match self {
            Rule::Text(selector) => document
                .select(selector)
                .next()
                .map(|el| FieldValue::Text(element_text(el))),
            Rule::Attr { selector, attr } => document
                .select(selector)
                .next()
                .and_then(|el| el.value().attr(attr))
                .map(|v| FieldValue::Text(v.to_string())),
            Rule::List(selector) => {
                let items: Vec<String> = document.select(selector).map(element_text).collect();
                (!items.is_empty()).then_some(FieldValue::List(items))
            }
            Rule::NextSibling(selector) => document
                .select(selector)
                .next()
                .and_then(|el| el.next_siblings().find_map(ElementRef::wrap))
                .map(|el| FieldValue::Text(element_text(el))),
            Rule::Labeled { item, label, value } => document
                .select(item)
                .find(|el| element_text(*el).contains(label.as_str()))
                .and_then(|el| el.select(value).next())
                .map(|el| FieldValue::Text(element_text(el))),
            Rule::Pairs {
                item,
                first,
                second,
            } => {
                let pairs: Vec<(String, String)> = document
                    .select(item)
                    .map(|el| {
                        let head = el.select(first).next().unwrap_or(el);
                        let tail = el.select(second).next().map(element_text).unwrap_or_default();
                        (element_text(head), tail)
                    })
                    .collect();
                (!pairs.is_empty()).then_some(FieldValue::Pairs(pairs))
            }
        }
    }
}

/// Raw extracted value, not yet normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Pairs(Vec<(String, String)>),
}

/// Field name → raw value for one document. Absent selectors leave no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    values: BTreeMap<Field, FieldValue>,
}

impl RawFields {
    pub fn insert(&mut self, field: Field, value: FieldValue) {
        self.values.insert(field, value);
    }

    /// Single value; the first entry for list values.
    pub fn text(&self, field: Field) -> Option<&str> {
        match self.values.get(&field)? {
            FieldValue::Text(s) => Some(s.as_str()),
            FieldValue::List(items) => items.first().map(String::as_str),
            FieldValue::Pairs(pairs) => pairs.first().map(|(head, _)| head.as_str()),
        }
    }

    /// All values; a text value becomes a one-element list.
    pub fn list(&self, field: Field) -> Vec<&str> {
        match self.values.get(&field) {
            Some(FieldValue::Text(s)) => vec![s.as_str()],
            Some(FieldValue::List(items)) => items.iter().map(String::as_str).collect(),
            Some(FieldValue::Pairs(pairs)) => pairs.iter().map(|(head, _)| head.as_str()).collect(),
            None => Vec::new(),
        }
    }

    /// All values as pairs; plain values get an empty second half.
    pub fn pairs(&self, field: Field) -> Vec<(&str, &str)> {
        match self.values.get(&field) {
            Some(FieldValue::Pairs(pairs)) => pairs
                .iter()
                .map(|(head, tail)| (head.as_str(), tail.as_str()))
                .collect(),
            _ => self.list(field).into_iter().map(|head| (head, "")).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The compiled field table for detail pages.
#[derive(Debug, Clone)]
pub struct DetailRules {
    rules: BTreeMap<Field, Rule>,
}

impl DetailRules {
    /// Compile a rule table. A `title` rule is mandatory.
    pub fn compile(specs: &BTreeMap<Field, RuleSpec>) -> Result<Self> {
        if !specs.contains_key(&Field::Title) {
            bail!("extraction rules must define a `title` rule");
        }

        let mut rules = BTreeMap::new();
        for (field, spec) in specs {
            let rule = spec
                .compile()
                .with_context(|| format!("invalid rule for field `{}`", field))?;
            rules.insert(*field, rule);
        }

        Ok(Self { rules })
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.rules.keys().copied()
    }

    pub fn extract(&self, html: &str) -> RawFields {
        let document = Html::parse_document(html);
        self.extract_document(&document)
    }

    pub fn extract_document(&self, document: &Html) -> RawFields {
        let mut fields = RawFields::default();
        for (field, rule) in &self.rules {
            if let Some(value) = rule.apply(document) {
                fields.insert(*field, value);
            }
        }
        fields
    }
}

fn default_link_attr() -> String {
    "href".to_string()
}

/// Where the detail links of a result page are found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRuleSpec {
    pub selector: String,
    #[serde(default = "default_link_attr")]
    pub attr: String,
    /// Only keep absolute links starting with this prefix.
    #[serde(default)]
    pub prefix: Option<String>,
}

impl LinkRuleSpec {
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attr: default_link_attr(),
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    pub fn compile(&self) -> Result<LinkRule> {
        Ok(LinkRule {
            selector: parse_selector(&self.selector).context("invalid link selector")?,
            attr: self.attr.clone(),
            prefix: self.prefix.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LinkRule {
    selector: Selector,
    attr: String,
    prefix: Option<String>,
}

impl LinkRule {
    pub fn links(&self, html: &str, base_url: &Url) -> Vec<String> {
        let document = Html::parse_document(html);
        self.links_in(&document, base_url)
    }

    /// Absolute links in document order. Unresolvable hrefs are skipped.
    pub fn links_in(&self, document: &Html, base_url: &Url) -> Vec<String> {
        document
            .select(&self.selector)
            .filter_map(|el| el.value().attr(&self.attr))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .filter_map(|href| base_url.join(href).ok())
            .map(String::from)
            .filter(|link| match &self.prefix {
                Some(prefix) => link.starts_with(prefix.as_str()),
                None => true,
            })
            .collect()
    }
}

/// Whether an enabled element matching `selector` exists.
pub fn control_present(document: &Html, selector: &Selector) -> bool {
    document.select(selector).any(|el| {
        let v = el.value();
        v.attr("disabled").is_none()
            && v.attr("aria-disabled") != Some("true")
            && !v.classes().any(|c| c == "disabled")
    })
}

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("invalid selector `{}`: {}", selector, e))
}
