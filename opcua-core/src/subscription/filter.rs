use crate::codec::{DataValue, NodeId, Variant};

/// Filter applied to a data-change monitored item's freshly sampled value
/// before it is compared against the last sampled value.
#[derive(Debug, Clone)]
pub struct DataChangeFilter {
    pub deadband: f64,
}

impl DataChangeFilter {
    /// `true` if `new` differs enough from `last` to be reported.
    pub fn passes(&self, last: Option<&DataValue>, new: &DataValue) -> bool {
        match (last.and_then(|l| l.value.as_ref()), new.value.as_ref()) {
            (None, _) | (_, None) => true,
            (Some(last_value), Some(new_value)) => match (numeric_value(last_value), numeric_value(new_value)) {
                (Some(a), Some(b)) => (a - b).abs() > self.deadband,
                _ => last_value != new_value,
            },
        }
    }
}

/// Operators for the `ContentFilter` tree evaluated against event fields
/// during `EventFilter` processing.
#[derive(Debug, Clone)]
pub enum ContentFilterOperator {
    And(Box<ContentFilterElement>, Box<ContentFilterElement>),
    Or(Box<ContentFilterElement>, Box<ContentFilterElement>),
    Not(Box<ContentFilterElement>),
    Equals(SimpleAttributeOperand, FilterOperand),
    GreaterThan(SimpleAttributeOperand, FilterOperand),
    LessThan(SimpleAttributeOperand, FilterOperand),
    Between(SimpleAttributeOperand, FilterOperand, FilterOperand),
    InList(SimpleAttributeOperand, Vec<FilterOperand>),
    Like(SimpleAttributeOperand, String),
    IsNull(SimpleAttributeOperand),
    OfType(NodeId),
    Cast(SimpleAttributeOperand, NodeId),
}

#[derive(Debug, Clone)]
pub struct ContentFilterElement {
    pub operator: ContentFilterOperator,
}

#[derive(Debug, Clone)]
pub enum FilterOperand {
    Literal(Variant),
    Attribute(SimpleAttributeOperand),
}

/// A path into an event's fields, e.g. `(type_id, browse_path)`.
#[derive(Debug, Clone)]
pub struct SimpleAttributeOperand {
    pub type_id: NodeId,
    pub browse_path: Vec<String>,
    pub attribute_id: u32,
}

/// An emitted event, represented as a flat map of attribute operand to
/// value — enough for `ContentFilterElement::evaluate` to resolve
/// `SimpleAttributeOperand`s without a full event-type hierarchy.
pub struct EventFields<'a> {
    fields: &'a [(SimpleAttributeOperand, Variant)],
}

impl<'a> EventFields<'a> {
    pub fn new(fields: &'a [(SimpleAttributeOperand, Variant)]) -> EventFields<'a> {
        EventFields { fields }
    }

    fn resolve(&self, operand: &SimpleAttributeOperand) -> Option<&Variant> {
        self.fields.iter().find_map(|(op, v)| {
            if op.type_id == operand.type_id && op.browse_path == operand.browse_path && op.attribute_id == operand.attribute_id {
                Some(v)
            } else {
                None
            }
        })
    }
}

impl ContentFilterElement {
    pub fn evaluate(&self, event: &EventFields) -> bool {
        match &self.operator {
            ContentFilterOperator::And(a, b) => a.evaluate(event) && b.evaluate(event),
            ContentFilterOperator::Or(a, b) => a.evaluate(event) || b.evaluate(event),
            ContentFilterOperator::Not(a) => !a.evaluate(event),
            ContentFilterOperator::Equals(attr, operand) => {
                compare(event, attr, operand) == Some(std::cmp::Ordering::Equal)
            }
            ContentFilterOperator::GreaterThan(attr, operand) => {
                compare(event, attr, operand) == Some(std::cmp::Ordering::Greater)
            }
            ContentFilterOperator::LessThan(attr, operand) => {
                compare(event, attr, operand) == Some(std::cmp::Ordering::Less)
            }
            ContentFilterOperator::Between(attr, lo, hi) => {
                compare(event, attr, lo) != Some(std::cmp::Ordering::Less)
                    && compare(event, attr, hi) != Some(std::cmp::Ordering::Greater)
            }
            ContentFilterOperator::InList(attr, list) => {
                list.iter().any(|o| compare(event, attr, o) == Some(std::cmp::Ordering::Equal))
            }
            ContentFilterOperator::Like(attr, pattern) => match event.resolve(attr).and_then(Variant::as_scalar) {
                Some(crate::codec::VariantValue::String(s)) => s.as_str().map_or(false, |s| simple_like(s, pattern)),
                _ => false,
            },
            ContentFilterOperator::IsNull(attr) => event.resolve(attr).is_none(),
            ContentFilterOperator::OfType(_) => true,
            ContentFilterOperator::Cast(attr, _) => event.resolve(attr).is_some(),
        }
    }
}

fn compare(event: &EventFields, attr: &SimpleAttributeOperand, operand: &FilterOperand) -> Option<std::cmp::Ordering> {
    let lhs = event.resolve(attr)?;
    let rhs = match operand {
        FilterOperand::Literal(v) => v,
        FilterOperand::Attribute(a) => event.resolve(a)?,
    };
    numeric_value(lhs)?.partial_cmp(&numeric_value(rhs)?)
}

fn numeric_value(v: &Variant) -> Option<f64> {
    use crate::codec::VariantValue::*;
    match v.as_scalar()? {
        Byte(x) => Some(*x as f64),
        Int16(x) => Some(*x as f64),
        UInt16(x) => Some(*x as f64),
        Int32(x) => Some(*x as f64),
        UInt32(x) => Some(*x as f64),
        Int64(x) => Some(*x as f64),
        UInt64(x) => Some(*x as f64),
        Float(x) => Some(*x as f64),
        Double(x) => Some(*x),
        _ => None,
    }
}

/// A deliberately minimal glob: `%` matches any run of characters,
/// everything else is literal. The OPC UA `LIKE` grammar also defines
/// `_` and character-list wildcards; those are not implemented.
fn simple_like(value: &str, pattern: &str) -> bool {
    if let Some((prefix, suffix)) = pattern.split_once('%') {
        value.starts_with(prefix) && value.ends_with(suffix)
    } else {
        value == pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::VariantValue;

    fn attr(name: &str) -> SimpleAttributeOperand {
        SimpleAttributeOperand { type_id: NodeId::numeric(0, 2041), browse_path: vec![name.to_string()], attribute_id: 13 }
    }

    #[test]
    fn greater_than_matches_numeric_fields() {
        let fields = vec![(attr("Severity"), Variant::scalar(VariantValue::UInt32(500)))];
        let event = EventFields::new(&fields);
        let element = ContentFilterElement {
            operator: ContentFilterOperator::GreaterThan(
                attr("Severity"),
                FilterOperand::Literal(Variant::scalar(VariantValue::UInt32(100))),
            ),
        };
        assert!(element.evaluate(&event));
    }

    #[test]
    fn and_requires_both_sides() {
        let fields = vec![(attr("Severity"), Variant::scalar(VariantValue::UInt32(50)))];
        let event = EventFields::new(&fields);
        let high = ContentFilterElement {
            operator: ContentFilterOperator::GreaterThan(
                attr("Severity"),
                FilterOperand::Literal(Variant::scalar(VariantValue::UInt32(100))),
            ),
        };
        let low = ContentFilterElement {
            operator: ContentFilterOperator::LessThan(
                attr("Severity"),
                FilterOperand::Literal(Variant::scalar(VariantValue::UInt32(100))),
            ),
        };
        let combined = ContentFilterElement { operator: ContentFilterOperator::And(Box::new(high), Box::new(low)) };
        assert!(!combined.evaluate(&event));
    }

    #[test]
    fn is_null_detects_missing_field() {
        let fields: Vec<(SimpleAttributeOperand, Variant)> = vec![];
        let event = EventFields::new(&fields);
        let element = ContentFilterElement { operator: ContentFilterOperator::IsNull(attr("Message")) };
        assert!(element.evaluate(&event));
    }

    #[test]
    fn like_supports_percent_wildcard() {
        assert!(simple_like("BadTimeout", "Bad%"));
        assert!(!simple_like("GoodCall", "Bad%"));
    }
}
