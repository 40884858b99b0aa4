// Transform Planner
//
// Renders a pipeline's column transforms and dedupe key as one SQL query
// over the registered bronze batch.
//
// Each output column starts as a plain reference to the input column and
// is rewritten in transform order; the final projection list is the
// surviving columns in their original order, with new bucket columns
// appended at the end.

use anyhow::{bail, Result};

use crate::models::{Threshold, Transform};

const RANK_COLUMN: &str = "__dedupe_rank";

/// One output column: its name and the SQL expression producing it
#[derive(Debug, Clone, PartialEq)]
struct Projection {
    name: String,
    expr: String,
}

pub struct TransformPlanner;

impl TransformPlanner {
    /// Render the transform query.
    ///
    /// Fails when a transform or the dedupe key refers to a column that does
    /// not exist at that point (dropped columns excepted).
    pub fn render(
        input_table: &str,
        columns: &[String],
        transforms: &[Transform],
        dedupe_key: &[String],
    ) -> Result<String> {
        let mut projections: Vec<Projection> = columns
            .iter()
            .map(|c| Projection {
                name: c.clone(),
                expr: quote_ident(c),
            })
            .collect();

        for transform in transforms {
            Self::apply(&mut projections, transform)?;
        }

        if projections.is_empty() {
            bail!("Transforms removed every column from the batch");
        }

        let select_list = projections
            .iter()
            .map(|p| format!("{} AS {}", p.expr, quote_ident(&p.name)))
            .collect::<Vec<_>>()
            .join(", ");
        let transformed = format!("SELECT {} FROM {}", select_list, quote_ident(input_table));

        if dedupe_key.is_empty() {
            return Ok(transformed);
        }

        for key in dedupe_key {
            if !projections.iter().any(|p| &p.name == key) {
                bail!("Dedupe key column '{}' is not in the transformed output", key);
            }
        }

        let keys = dedupe_key
            .iter()
            .map(|k| quote_ident(k))
            .collect::<Vec<_>>()
            .join(", ");
        let output = projections
            .iter()
            .map(|p| quote_ident(&p.name))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!(
            "SELECT {output} FROM (SELECT *, ROW_NUMBER() OVER (PARTITION BY {keys} ORDER BY {keys}) AS {rank} \
             FROM ({transformed}) AS transformed) AS ranked WHERE {rank} = 1",
            output = output,
            keys = keys,
            rank = quote_ident(RANK_COLUMN),
            transformed = transformed,
        ))
    }

    fn apply(projections: &mut Vec<Projection>, transform: &Transform) -> Result<()> {
        match transform {
            Transform::Uppercase { column } => {
                let p = Self::find(projections, column)?;
                p.expr = format!("upper({})", p.expr);
            }
            Transform::Replace {
                column,
                pattern,
                replacement,
            } => {
                let p = Self::find(projections, column)?;
                // 'g' replaces every match, not just the first
                p.expr = format!(
                    "regexp_replace({}, {}, {}, 'g')",
                    p.expr,
                    quote_literal(pattern),
                    quote_literal(replacement)
                );
            }
            Transform::Bucket {
                column,
                target,
                thresholds,
                otherwise,
            } => {
                let source = Self::find(projections, column)?.expr.clone();
                let expr = bucket_expr(&source, thresholds, otherwise);

                match projections.iter_mut().find(|p| &p.name == target) {
                    Some(existing) => existing.expr = expr,
                    None => projections.push(Projection {
                        name: target.clone(),
                        expr,
                    }),
                }
            }
            Transform::DropColumns { columns } => {
                projections.retain(|p| !columns.contains(&p.name));
            }
            Transform::Rename { from, to } => {
                if from != to && projections.iter().any(|p| &p.name == to) {
                    bail!("Cannot rename '{}' to '{}': column already exists", from, to);
                }
                Self::find(projections, from)?.name = to.clone();
            }
        }

        Ok(())
    }

    fn find<'a>(projections: &'a mut [Projection], column: &str) -> Result<&'a mut Projection> {
        match projections.iter_mut().find(|p| p.name == column) {
            Some(p) => Ok(p),
            None => bail!("Transform refers to unknown column '{}'", column),
        }
    }
}

fn bucket_expr(source: &str, thresholds: &[Threshold], otherwise: &str) -> String {
    if thresholds.is_empty() {
        return quote_literal(otherwise);
    }

    let mut expr = String::from("CASE");
    for threshold in thresholds {
        expr.push_str(&format!(
            " WHEN {} < {} THEN {}",
            source,
            threshold.below,
            quote_literal(&threshold.label)
        ));
    }
    expr.push_str(&format!(" ELSE {} END", quote_literal(otherwise)));
    expr
}

/// Double-quote an identifier so mixed-case names survive normalization
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quote a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_passthrough() {
        let sql = TransformPlanner::render("bronze", &cols(&["date_key", "_rescued_data"]), &[], &[]).unwrap();
        assert_eq!(
            sql,
            r#"SELECT "date_key" AS "date_key", "_rescued_data" AS "_rescued_data" FROM "bronze""#
        );
    }

    #[test]
    fn test_uppercase_and_drop() {
        let transforms = vec![
            Transform::Uppercase {
                column: "user_name".to_string(),
            },
            Transform::DropColumns {
                columns: cols(&["_rescued_data", "not_there"]),
            },
        ];

        let sql = TransformPlanner::render(
            "bronze",
            &cols(&["user_id", "user_name", "_rescued_data"]),
            &transforms,
            &[],
        )
        .unwrap();
        assert_eq!(
            sql,
            r#"SELECT "user_id" AS "user_id", upper("user_name") AS "user_name" FROM "bronze""#
        );
    }

    #[test]
    fn test_bucket_and_replace() {
        let transforms = vec![
            Transform::Bucket {
                column: "duration_sec".to_string(),
                target: "durationFlag".to_string(),
                thresholds: vec![
                    Threshold {
                        below: 150.0,
                        label: "low".to_string(),
                    },
                    Threshold {
                        below: 300.0,
                        label: "medium".to_string(),
                    },
                ],
                otherwise: "high".to_string(),
            },
            Transform::Replace {
                column: "track_name".to_string(),
                pattern: "-".to_string(),
                replacement: " ".to_string(),
            },
        ];

        let sql = TransformPlanner::render("bronze", &cols(&["track_name", "duration_sec"]), &transforms, &[])
            .unwrap();
        assert!(sql.contains(r#"regexp_replace("track_name", '-', ' ', 'g') AS "track_name""#));
        assert!(sql.contains(
            r#"CASE WHEN "duration_sec" < 150 THEN 'low' WHEN "duration_sec" < 300 THEN 'medium' ELSE 'high' END AS "durationFlag""#
        ));
        // New column goes last
        assert!(sql.find("durationFlag").unwrap() > sql.find("duration_sec\" AS").unwrap());
    }

    #[test]
    fn test_rename() {
        let transforms = vec![Transform::Rename {
            from: "name".to_string(),
            to: "artist_name".to_string(),
        }];
        let sql = TransformPlanner::render("bronze", &cols(&["name"]), &transforms, &[]).unwrap();
        assert_eq!(sql, r#"SELECT "name" AS "artist_name" FROM "bronze""#);

        let clash = vec![Transform::Rename {
            from: "a".to_string(),
            to: "b".to_string(),
        }];
        assert!(TransformPlanner::render("bronze", &cols(&["a", "b"]), &clash, &[]).is_err());
    }

    #[test]
    fn test_dedupe_wraps_query() {
        let sql = TransformPlanner::render("bronze", &cols(&["user_id", "user_name"]), &[], &cols(&["user_id"]))
            .unwrap();

        assert!(sql.starts_with(r#"SELECT "user_id", "user_name" FROM (SELECT *, ROW_NUMBER() OVER (PARTITION BY "user_id""#));
        assert!(sql.ends_with(r#"WHERE "__dedupe_rank" = 1"#));
    }

    #[test]
    fn test_unknown_columns_are_errors() {
        let transforms = vec![Transform::Uppercase {
            column: "missing".to_string(),
        }];
        assert!(TransformPlanner::render("bronze", &cols(&["user_id"]), &transforms, &[]).is_err());

        let dropped_key = vec![Transform::DropColumns {
            columns: cols(&["user_id"]),
        }];
        let err = TransformPlanner::render(
            "bronze",
            &cols(&["user_id", "user_name"]),
            &dropped_key,
            &cols(&["user_id"]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Dedupe key"));
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
        assert_eq!(quote_literal("it's"), "'it''s'");
    }
}
