//! Document-level validation rules
//!
//! Limits are checked on the selected operation before any resolver runs.
//! A violation rejects the whole request.

use graphql_parser::query::{
    Definition, Document, FragmentDefinition, OperationDefinition, Selection, SelectionSet,
};
use std::collections::HashMap;

/// Limits applied to every execution of an executor
///
/// `None` disables the depth or complexity check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationRules {
    pub max_query_depth: Option<usize>,
    pub max_query_complexity: Option<usize>,
    pub disable_introspection: bool,
}

type Fragments<'d, 'q> = HashMap<&'d str, &'d FragmentDefinition<'q, String>>;

impl ValidationRules {
    /// Limit value where `0` means "disabled"
    pub fn limit(value: usize) -> Option<usize> {
        (value > 0).then_some(value)
    }

    /// Check `operation`, returning one message per violated rule
    ///
    /// The operation is measured in a single walk; each fragment is measured
    /// once however many times it is spread.
    pub fn check<'q>(
        &self,
        document: &Document<'q, String>,
        operation: &OperationDefinition<'q, String>,
    ) -> Vec<String> {
        let fragments = fragments(document);
        let mut fragment_cache = HashMap::new();
        let measured = measure(
            operation_selection_set(operation),
            &fragments,
            &mut fragment_cache,
        );
        let mut violations = Vec::new();

        if let Some(max) = self.max_query_depth
            && measured.depth > max
        {
            violations.push(format!(
                "Max query depth should be {} but got {}.",
                max, measured.depth
            ));
        }

        if let Some(max) = self.max_query_complexity
            && measured.complexity > max
        {
            violations.push(format!(
                "Max query complexity should be {} but got {}.",
                max, measured.complexity
            ));
        }

        if self.disable_introspection && measured.introspection {
            violations.push(
                "GraphQL introspection is not allowed, but the query contained __schema or __type"
                    .to_string(),
            );
        }

        violations
    }
}

pub(crate) fn fragments<'d, 'q>(document: &'d Document<'q, String>) -> Fragments<'d, 'q> {
    document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Fragment(fragment) => Some((fragment.name.as_str(), fragment)),
            Definition::Operation(_) => None,
        })
        .collect()
}

pub(crate) fn operation_selection_set<'d, 'q>(
    operation: &'d OperationDefinition<'q, String>,
) -> &'d SelectionSet<'q, String> {
    match operation {
        OperationDefinition::SelectionSet(set) => set,
        OperationDefinition::Query(query) => &query.selection_set,
        OperationDefinition::Mutation(mutation) => &mutation.selection_set,
        OperationDefinition::Subscription(subscription) => &subscription.selection_set,
    }
}

/// What the rules look at in a selection set
///
/// Root fields have depth 1 and each nested level adds 1. Every field costs 1
/// towards complexity. Fragments are transparent for both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Measurement {
    depth: usize,
    complexity: usize,
    introspection: bool,
}

impl Measurement {
    fn absorb(&mut self, nested: Measurement) {
        self.depth = self.depth.max(nested.depth);
        self.complexity = self.complexity.saturating_add(nested.complexity);
        self.introspection |= nested.introspection;
    }
}

enum Computation<T> {
    InProgress,
    Done(T),
}

fn measure<'d, 'q>(
    set: &'d SelectionSet<'q, String>,
    fragments: &Fragments<'d, 'q>,
    fragment_cache: &mut HashMap<&'d str, Computation<Measurement>>,
) -> Measurement {
    let mut measured = Measurement::default();
    for selection in &set.items {
        match selection {
            Selection::Field(field) => {
                let nested = measure(&field.selection_set, fragments, fragment_cache);
                measured.absorb(Measurement {
                    depth: nested.depth + 1,
                    complexity: nested.complexity.saturating_add(1),
                    introspection: nested.introspection
                        || field.name == "__schema"
                        || field.name == "__type",
                });
            }
            Selection::InlineFragment(inline) => {
                measured.absorb(measure(&inline.selection_set, fragments, fragment_cache));
            }
            Selection::FragmentSpread(spread) => {
                // Unknown and cyclic spreads add nothing
                let Some((&name, &fragment)) = fragments.get_key_value(spread.fragment_name.as_str())
                else {
                    continue;
                };
                let nested = match fragment_cache.get(name) {
                    Some(Computation::Done(cached)) => *cached,
                    Some(Computation::InProgress) => continue,
                    None => {
                        fragment_cache.insert(name, Computation::InProgress);
                        let nested = measure(&fragment.selection_set, fragments, fragment_cache);
                        fragment_cache.insert(name, Computation::Done(nested));
                        nested
                    }
                };
                measured.absorb(nested);
            }
        }
    }
    measured
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql_parser::query::parse_query;

    fn check(rules: ValidationRules, query: &str) -> Vec<String> {
        let document = parse_query::<String>(query).expect("valid query");
        let operation = document
            .definitions
            .iter()
            .find_map(|d| match d {
                Definition::Operation(op) => Some(op),
                _ => None,
            })
            .expect("operation");
        rules.check(&document, operation)
    }

    #[test]
    fn test_depth_counts_nested_fields() {
        let rules = ValidationRules {
            max_query_depth: Some(2),
            ..Default::default()
        };
        assert!(check(rules, "{ a { b } }").is_empty());

        let errors = check(rules, "{ a { b { c } } }");
        assert_eq!(errors, vec!["Max query depth should be 2 but got 3.".to_string()]);
    }

    #[test]
    fn test_fragments_are_transparent_for_depth() {
        let rules = ValidationRules {
            max_query_depth: Some(2),
            ..Default::default()
        };
        let errors = check(
            rules,
            "query { a { ...Deep } } fragment Deep on A { b { c } }",
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("got 3"));
    }

    #[test]
    fn test_cyclic_fragments_terminate() {
        let rules = ValidationRules {
            max_query_depth: Some(10),
            max_query_complexity: Some(10),
            ..Default::default()
        };
        let errors = check(
            rules,
            "query { a { ...X } } fragment X on A { b { ...Y } } fragment Y on B { ...X }",
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_fragment_fan_out_is_measured_once_per_fragment() {
        let chain = 30;
        let mut query = String::from("query { a { ...F0 } }");
        for i in 0..chain {
            query.push_str(&format!(
                " fragment F{i} on A {{ x{i}: a {{ ...F{next} }} y{i}: a {{ ...F{next} }} }}",
                next = i + 1
            ));
        }
        let rules = ValidationRules {
            max_query_depth: Some(1000),
            max_query_complexity: Some(1000),
            disable_introspection: true,
        };

        let started = std::time::Instant::now();
        let errors = check(rules, &query);
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        assert_eq!(
            errors,
            vec!["Max query complexity should be 1000 but got 2147483647.".to_string()]
        );
    }

    #[test]
    fn test_shared_fragment_counts_at_each_spread() {
        let rules = ValidationRules {
            max_query_complexity: Some(4),
            ..Default::default()
        };
        let errors = check(
            rules,
            "query { a { ...Pair } b { ...Pair } } fragment Pair on A { x y }",
        );
        assert_eq!(
            errors,
            vec!["Max query complexity should be 4 but got 6.".to_string()]
        );
    }

    #[test]
    fn test_introspection_inside_fragment_is_found() {
        let rules = ValidationRules {
            disable_introspection: true,
            ..Default::default()
        };
        let errors = check(
            rules,
            "query { ...Meta ping } fragment Meta on Query { __schema { queryType { name } } }",
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_complexity() {
        let rules = ValidationRules {
            max_query_complexity: Some(3),
            ..Default::default()
        };
        assert!(check(rules, "{ a { b c } }").is_empty());
        let errors = check(rules, "{ a { b c d } }");
        assert_eq!(
            errors,
            vec!["Max query complexity should be 3 but got 4.".to_string()]
        );
    }

    #[test]
    fn test_introspection_can_be_disabled() {
        let rules = ValidationRules {
            disable_introspection: true,
            ..Default::default()
        };
        assert!(check(rules, "{ ping __typename }").is_empty());
        assert_eq!(check(rules, "{ __schema { types { name } } }").len(), 1);
        assert_eq!(check(rules, "{ __type(name: \"Query\") { name } }").len(), 1);
    }

    #[test]
    fn test_zero_limit_disables_check() {
        assert_eq!(ValidationRules::limit(0), None);
        assert_eq!(ValidationRules::limit(5), Some(5));
    }
}
