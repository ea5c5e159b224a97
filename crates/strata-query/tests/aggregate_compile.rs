//! Aggregate DSL compilation through the public API.

use serde_json::json;
use strata_query::{compile_search, CompileOptions, CompiledAggregate, ParseError, SearchQuery};

fn compile(request: serde_json::Value) -> strata_query::CompiledSearch {
    let query = SearchQuery::from_json(&request).unwrap();
    compile_search(&query, &CompileOptions::default()).unwrap()
}

#[test]
fn test_flat_aggregation_over_relations() {
    let compiled = compile(json!({
        "labels": ["Company"],
        "where": {
            "DEPARTMENT": {
                "$alias": "$department",
                "EMPLOYEE": {"$alias": "$employee", "TASK": {"$alias": "$task"}}
            }
        },
        "aggregate": {
            "employee_count": {"fn": "count", "alias": "$employee"},
            "departments": {"fn": "collect", "uniq": true, "field": "name", "alias": "$department"},
            "totalStoryPoints": {"fn": "sum", "field": "storyPoints", "alias": "$task"}
        }
    }));

    assert_eq!(compiled.compiled.aliases_map["$department"], "record1");
    assert_eq!(compiled.compiled.aliases_map["$employee"], "record2");
    assert_eq!(compiled.compiled.aliases_map["$task"], "record3");

    let Some(CompiledAggregate::Flat(flat)) = &compiled.aggregate else {
        panic!("expected flat aggregation");
    };
    assert!(flat.with_part.contains("count(record2) AS employee_count"));
    assert!(flat
        .with_part
        .contains("collect(DISTINCT record1.name)[0..100] AS departments"));
    assert!(flat.with_part.contains("sum(record3.storyPoints) AS totalStoryPoints"));
    assert!(flat.record_part.ends_with(
        "employee_count: employee_count, departments: departments, totalStoryPoints: totalStoryPoints}"
    ));

    let lines: Vec<&str> = compiled.statement.lines().collect();
    assert_eq!(lines[0], "MATCH (record:__RECORD__:`Company`)");
    assert_eq!(lines[4], "WITH record, record1, record2, record3");
    assert!(lines[6].starts_with("WITH record, count(record2) AS employee_count"));
    assert_eq!(
        lines[7],
        "WITH record, employee_count, departments, totalStoryPoints ORDER BY record.__id DESC SKIP 0 LIMIT 100"
    );
    assert!(lines[8].starts_with("RETURN record {.__id"));
}

#[test]
fn test_three_level_nested_collect() {
    let compiled = compile(json!({
        "where": {
            "DEPARTMENT": {
                "$alias": "$department",
                "EMPLOYEE": {"$alias": "$employee", "TASK": {"$alias": "$task"}}
            }
        },
        "aggregate": {
            "departments": {
                "fn": "collect",
                "alias": "$department",
                "aggregate": {
                    "employees": {
                        "fn": "collect",
                        "alias": "$employee",
                        "aggregate": {
                            "tasks": {
                                "fn": "collect",
                                "alias": "$task",
                                "orderBy": {"salary": "asc"},
                                "limit": 5
                            }
                        }
                    }
                }
            }
        }
    }));

    let Some(CompiledAggregate::Nested(nested)) = &compiled.aggregate else {
        panic!("expected nested aggregation");
    };
    let depths: Vec<usize> = nested
        .statements
        .iter()
        .map(|s| s.record_variables.len())
        .collect();
    assert_eq!(depths, vec![3, 2, 1]);

    assert!(nested.statements[0]
        .with_statement
        .ends_with(r#", "^salary")[0..5] AS tasks"#));
    assert!(nested.statements[1]
        .with_statement
        .ends_with(r#", "^__id")[0..100] AS employees"#));
    assert!(nested.statements[2]
        .with_statement
        .starts_with("WITH record, apoc.coll.sortMaps("));

    // Statements run in list order, before pagination and the projection.
    let statement = &compiled.statement;
    let innermost = statement.find("AS tasks").unwrap();
    let middle = statement.find("AS employees").unwrap();
    let outermost = statement.find("AS departments").unwrap();
    let page = statement.find("SKIP 0 LIMIT 100").unwrap();
    assert!(innermost < middle && middle < outermost && outermost < page);
}

#[test]
fn test_aggregate_errors() {
    let options = CompileOptions::default();

    let query = SearchQuery::from_json(&json!({
        "aggregate": {"total": {"fn": "sum", "alias": "$record"}}
    }))
    .unwrap();
    assert!(matches!(
        compile_search(&query, &options),
        Err(ParseError::InvalidAggregate { .. })
    ));

    let query = SearchQuery::from_json(&json!({
        "aggregate": {"n": {"fn": "count", "alias": "$nobody"}}
    }))
    .unwrap();
    let err = compile_search(&query, &options).unwrap_err();
    assert_eq!(err.key(), "n");
    assert_eq!(err.value(), &json!("$nobody"));
}

#[test]
fn test_collect_window_limits() {
    let options = CompileOptions::default();
    let request = |skip: u64| {
        SearchQuery::from_json(&json!({
            "where": {"EMPLOYEE": {"$alias": "$employee"}},
            "aggregate": {"staff": {"fn": "collect", "alias": "$employee", "skip": skip, "limit": 5}}
        }))
        .unwrap()
    };

    let err = compile_search(&request(u64::MAX), &options).unwrap_err();
    assert!(matches!(err, ParseError::InvalidAggregate { .. }));
    assert_eq!(err.key(), "staff");

    let compiled = compile_search(&request(u64::MAX - 5), &options).unwrap();
    let Some(CompiledAggregate::Flat(flat)) = &compiled.aggregate else {
        panic!("expected flat aggregation");
    };
    assert!(flat
        .with_part
        .ends_with(&format!("[{}..{}] AS staff", u64::MAX - 5, u64::MAX)));
}
