use crate::{
    db::query::{
        compile::{CompiledClause, CompiledFilter, CompiledNode},
        filter::FilterOp,
    },
    error::Error,
    record::Record,
    value::{Value, compare},
};
use claydb_schema::relation::Relation;
use std::{cmp::Ordering, collections::BTreeMap};

///
/// RelationSource
///
/// The seam between filter/sort evaluation and the store: fetch the
/// records one relation step away from `record`. Lookups yield zero or
/// one record; collection, junction, and tree steps yield the full
/// related set.
///

pub trait RelationSource {
    fn related(
        &self,
        owner_entity: &str,
        relation: &Relation,
        record: &Record,
    ) -> Result<Vec<Record>, Error>;
}

/// Evaluate a compiled filter against one record.
///
/// The result is the match multiplicity: how many joined tuples satisfy
/// the predicate. Without fan-out chains this is 0 or 1; with chains it
/// mirrors SQL join expansion (one parent row × N related rows), which the
/// caller collapses when `distinct` is requested. Chains join
/// independently; correlated sub-paths below a shared to-many step are
/// evaluated per final record.
pub fn evaluate_filter(
    filter: &CompiledFilter,
    record: &Record,
    src: &impl RelationSource,
) -> Result<usize, Error> {
    if filter.chains.is_empty() {
        let matched = eval_node(&filter.root, record, &BTreeMap::new(), src)?;
        return Ok(usize::from(matched));
    }

    // Inner-join semantics: a referenced chain with no related rows
    // produces no tuples, so the parent cannot match.
    let mut sets = Vec::with_capacity(filter.chains.len());
    for chain in &filter.chains {
        let candidates = materialize_chain(&chain.steps, record, src)?;
        if candidates.is_empty() {
            return Ok(0);
        }
        sets.push((chain.key.as_str(), candidates));
    }

    let mut indexes = vec![0usize; sets.len()];
    let mut matches = 0usize;

    loop {
        let assignment: BTreeMap<&str, &Record> = sets
            .iter()
            .zip(indexes.iter())
            .map(|((key, candidates), idx)| (*key, &candidates[*idx]))
            .collect();

        if eval_node(&filter.root, record, &assignment, src)? {
            matches += 1;
        }

        // Advance the mixed-radix tuple counter.
        let mut pos = 0;
        loop {
            if pos == indexes.len() {
                return Ok(matches);
            }
            indexes[pos] += 1;
            if indexes[pos] < sets[pos].1.len() {
                break;
            }
            indexes[pos] = 0;
            pos += 1;
        }
    }
}

/// Walk a relation chain from one record, flat-mapping each step.
fn materialize_chain(
    steps: &[(String, Relation)],
    record: &Record,
    src: &impl RelationSource,
) -> Result<Vec<Record>, Error> {
    let mut current = vec![record.clone()];

    for (owner, relation) in steps {
        let mut next = Vec::new();
        for rec in &current {
            next.extend(src.related(owner, relation, rec)?);
        }
        current = next;
        if current.is_empty() {
            break;
        }
    }

    Ok(current)
}

fn eval_node(
    node: &CompiledNode,
    record: &Record,
    assignment: &BTreeMap<&str, &Record>,
    src: &impl RelationSource,
) -> Result<bool, Error> {
    match node {
        CompiledNode::All(nodes) => {
            for node in nodes {
                if !eval_node(node, record, assignment, src)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        CompiledNode::Any(nodes) => {
            for node in nodes {
                if eval_node(node, record, assignment, src)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        CompiledNode::Clause(clause) => eval_clause(clause, record, assignment, src),
    }
}

fn eval_clause(
    clause: &CompiledClause,
    record: &Record,
    assignment: &BTreeMap<&str, &Record>,
    src: &impl RelationSource,
) -> Result<bool, Error> {
    let value = if let Some(chain) = &clause.chain {
        match assignment.get(chain.as_str()) {
            Some(joined) => joined.get(&clause.attribute).clone(),
            None => Value::Null,
        }
    } else {
        // To-one traversal with a null fallback for dangling references.
        let mut current = record.clone();
        let mut dangling = false;
        for (owner, relation) in &clause.steps {
            match src.related(owner, relation, &current)?.into_iter().next() {
                Some(next) => current = next,
                None => {
                    dangling = true;
                    break;
                }
            }
        }
        if dangling {
            Value::Null
        } else {
            current.get(&clause.attribute).clone()
        }
    };

    Ok(eval_op(clause.op, &value, &clause.operand))
}

fn eval_op(op: FilterOp, value: &Value, operand: &Value) -> bool {
    match op {
        FilterOp::Equals => values_equal(value, operand),
        FilterOp::NotEquals => !values_equal(value, operand),
        FilterOp::Lt => ordered(value, operand, Ordering::is_lt),
        FilterOp::Lte => ordered(value, operand, Ordering::is_le),
        FilterOp::Gt | FilterOp::DateAfter => ordered(value, operand, Ordering::is_gt),
        FilterOp::Gte => ordered(value, operand, Ordering::is_ge),
        FilterOp::DateBefore => ordered(value, operand, Ordering::is_lt),
        FilterOp::StartsWith => text_pair(value, operand)
            .is_some_and(|(v, needle)| v.starts_with(needle)),
        FilterOp::Contains => text_pair(value, operand)
            .is_some_and(|(v, needle)| v.contains(needle)),
        FilterOp::ValueIn => set_contains(operand, value),
        FilterOp::ValueNotIn => !set_contains(operand, value),
        FilterOp::IsNull => value.is_null(),
        FilterOp::IsNotNull => !value.is_null(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    if a.is_null() || b.is_null() {
        return a.is_null() && b.is_null();
    }
    compare(a, b) == Ordering::Equal
}

// Range operators never match null on either side; the boundary itself is
// excluded by the strict variants.
fn ordered(value: &Value, operand: &Value, accept: fn(Ordering) -> bool) -> bool {
    if value.is_null() || operand.is_null() {
        return false;
    }
    accept(compare(value, operand))
}

fn text_pair<'a>(value: &'a Value, operand: &'a Value) -> Option<(&'a str, &'a str)> {
    Some((value.as_text()?, operand.as_text()?))
}

fn set_contains(operand: &Value, value: &Value) -> bool {
    match operand {
        Value::List(items) => items.iter().any(|item| values_equal(item, value)),
        _ => false,
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    #[test]
    fn date_after_excludes_the_boundary() {
        let boundary = Value::Timestamp(Timestamp::parse("2025-01-01").unwrap());
        let same = boundary.clone();
        let later = Value::Timestamp(Timestamp::parse("2025-01-02").unwrap());

        assert!(!eval_op(FilterOp::DateAfter, &same, &boundary));
        assert!(eval_op(FilterOp::DateAfter, &later, &boundary));
        assert!(!eval_op(FilterOp::DateAfter, &Value::Null, &boundary));
    }

    #[test]
    fn equals_treats_null_as_a_value() {
        assert!(eval_op(FilterOp::Equals, &Value::Null, &Value::Null));
        assert!(!eval_op(FilterOp::Equals, &Value::Int(1), &Value::Null));
        assert!(!eval_op(FilterOp::Equals, &Value::Null, &Value::Int(1)));
    }

    #[test]
    fn set_membership() {
        let set = Value::List(vec![Value::Int(1), Value::Int(3)]);
        assert!(eval_op(FilterOp::ValueIn, &Value::Int(3), &set));
        assert!(!eval_op(FilterOp::ValueIn, &Value::Int(2), &set));
        assert!(eval_op(FilterOp::ValueNotIn, &Value::Int(2), &set));
    }

    #[test]
    fn text_operators_ignore_non_text() {
        let needle = Value::text("po");
        assert!(eval_op(FilterOp::StartsWith, &Value::text("post"), &needle));
        assert!(!eval_op(FilterOp::StartsWith, &Value::Int(1), &needle));
        assert!(eval_op(FilterOp::Contains, &Value::text("repost"), &needle));
    }

    #[test]
    fn range_operators_never_match_null() {
        assert!(!eval_op(FilterOp::Lt, &Value::Null, &Value::Int(5)));
        assert!(!eval_op(FilterOp::Gte, &Value::Int(5), &Value::Null));
        assert!(eval_op(FilterOp::Lte, &Value::Int(5), &Value::Int(5)));
        assert!(!eval_op(FilterOp::Lt, &Value::Int(5), &Value::Int(5)));
    }
}
