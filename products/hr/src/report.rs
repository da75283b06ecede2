//! Training compliance report: one row per employee, one cell per program.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_graphql::{Enum, SimpleObject};
use chrono::NaiveDate;
use entity::{department, employee, position, training_program, training_record};
use platform_api::{ApiError, ApiResult};
use platform_authz::{Action, PolicyEngine, Principal, Resource};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::compliance::{TrainingStatus, assess, latest};
use crate::service::{employees::order_by_name, today};

#[derive(Enum, Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Order rows by the completion date in one program column.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReportSort {
    pub program_id: Uuid,
    pub direction: SortDirection,
}

#[derive(Clone, Debug, Default)]
pub struct ReportFilter {
    pub employee_ids: Vec<Uuid>,
    pub program_id: Option<Uuid>,
    pub include_dismissed: bool,
    pub sort: Option<ReportSort>,
    pub as_of: Option<NaiveDate>,
}

#[derive(SimpleObject, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingReport {
    pub as_of: NaiveDate,
    pub programs: Vec<ProgramColumn>,
    pub rows: Vec<ReportRow>,
    pub summary: ReportSummary,
}

#[derive(SimpleObject, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramColumn {
    pub id: Uuid,
    pub name: String,
    pub recurrence_years: Option<i32>,
}

#[derive(SimpleObject, Clone, Debug, Serialize)]
pub struct ReportRow {
    pub employee: EmployeeSummary,
    pub cells: Vec<TrainingCell>,
}

impl ReportRow {
    fn completion_for(&self, program_id: Uuid) -> Option<NaiveDate> {
        self.cells
            .iter()
            .find(|cell| cell.program_id == program_id)
            .and_then(|cell| cell.completion_date)
    }
}

#[derive(SimpleObject, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    pub id: Uuid,
    pub full_name: String,
    pub short_name: String,
    pub position: Option<String>,
    pub department: Option<String>,
}

#[derive(SimpleObject, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingCell {
    pub program_id: Uuid,
    pub status: TrainingStatus,
    pub completion_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub days_until_expiry: Option<i64>,
    pub details: Option<String>,
    pub is_verified: bool,
}

#[derive(SimpleObject, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_employees: i32,
    pub programs: Vec<ProgramSummary>,
}

#[derive(SimpleObject, Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramSummary {
    pub program_id: Uuid,
    pub name: String,
    /// Employees with at least one completion.
    pub trained: i32,
    pub completed: i32,
    pub warning: i32,
    pub overdue: i32,
    pub not_completed: i32,
}

/// An employee together with the names of their position and department.
#[derive(Clone, Debug)]
pub struct StaffEntry {
    pub employee: employee::Model,
    pub position: Option<String>,
    pub department: Option<String>,
}

/// "Last F. M." from the name parts; missing parts are skipped.
pub fn short_name(last: &str, first: &str, middle: &str) -> String {
    let mut out = last.trim().to_string();
    for part in [first, middle] {
        if let Some(initial) = part.trim().chars().next() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.extend(initial.to_uppercase());
            out.push('.');
        }
    }
    out
}

/// Assemble the report from already loaded rows. Staff order is preserved unless `sort` is given.
pub fn build_report(
    as_of: NaiveDate,
    staff: Vec<StaffEntry>,
    programs: &[training_program::Model],
    records: &[training_record::Model],
    sort: Option<ReportSort>,
) -> TrainingReport {
    let mut by_pair: HashMap<(Uuid, Uuid), Vec<&training_record::Model>> = HashMap::new();
    for record in records {
        by_pair
            .entry((record.employee_id, record.training_program_id))
            .or_default()
            .push(record);
    }

    let mut summaries: Vec<ProgramSummary> = programs
        .iter()
        .map(|program| ProgramSummary {
            program_id: program.id,
            name: program.name.clone(),
            ..Default::default()
        })
        .collect();

    let mut rows = Vec::with_capacity(staff.len());
    for entry in staff {
        let employee = entry.employee;
        let mut cells = Vec::with_capacity(programs.len());
        for (program, summary) in programs.iter().zip(summaries.iter_mut()) {
            let newest = by_pair
                .get(&(employee.id, program.id))
                .and_then(|group| latest(group.iter().copied()));
            let assessment = assess(
                newest.map(|record| record.completion_date),
                program.recurrence_years,
                as_of,
            );
            match assessment.status {
                TrainingStatus::NotCompleted => summary.not_completed += 1,
                TrainingStatus::Completed => summary.completed += 1,
                TrainingStatus::Warning => summary.warning += 1,
                TrainingStatus::Overdue => summary.overdue += 1,
            }
            if newest.is_some() {
                summary.trained += 1;
            }
            cells.push(TrainingCell {
                program_id: program.id,
                status: assessment.status,
                completion_date: assessment.completion_date,
                expiry_date: assessment.expiry_date,
                days_until_expiry: assessment.days_until_expiry,
                details: newest.and_then(|record| record.details.clone()),
                is_verified: newest.is_some_and(|record| record.is_verified),
            });
        }
        rows.push(ReportRow {
            employee: EmployeeSummary {
                id: employee.id,
                short_name: short_name(
                    &employee.last_name,
                    &employee.first_name,
                    &employee.middle_name,
                ),
                full_name: employee.full_name(),
                position: entry.position,
                department: entry.department,
            },
            cells,
        });
    }

    if let Some(sort) = sort.filter(|s| programs.iter().any(|p| p.id == s.program_id)) {
        rows.sort_by(|a, b| {
            compare_completion(
                a.completion_for(sort.program_id),
                b.completion_for(sort.program_id),
                sort.direction,
            )
        });
    }

    TrainingReport {
        as_of,
        programs: programs
            .iter()
            .map(|program| ProgramColumn {
                id: program.id,
                name: program.name.clone(),
                recurrence_years: program.recurrence_years,
            })
            .collect(),
        summary: ReportSummary {
            total_employees: i32::try_from(rows.len()).unwrap_or(i32::MAX),
            programs: summaries,
        },
        rows,
    }
}

/// Missing completions go last in either direction.
fn compare_completion(
    a: Option<NaiveDate>,
    b: Option<NaiveDate>,
    direction: SortDirection,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match direction {
            SortDirection::Asc => a.cmp(&b),
            SortDirection::Desc => b.cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[instrument(
    name = "hr.report.training",
    skip_all,
    fields(
        user = %actor.username,
        employees = filter.employee_ids.len(),
        program = ?filter.program_id,
        include_dismissed = filter.include_dismissed
    )
)]
pub async fn training_report(
    db: &DatabaseConnection,
    actor: &Principal,
    filter: ReportFilter,
) -> ApiResult<TrainingReport> {
    PolicyEngine.check(actor, Action::View, Resource::Report)?;
    let as_of = filter.as_of.unwrap_or_else(today);

    let mut program_query =
        training_program::Entity::find().order_by_asc(training_program::Column::Name);
    if let Some(program_id) = filter.program_id {
        program_query = program_query.filter(training_program::Column::Id.eq(program_id));
    }
    let programs = program_query.all(db).await?;
    if filter.program_id.is_some() && programs.is_empty() {
        return Err(ApiError::not_found("training program"));
    }

    let mut employee_query = employee::Entity::find();
    if !filter.include_dismissed {
        employee_query = employee_query.filter(employee::Column::IsDismissed.eq(false));
    }
    if !filter.employee_ids.is_empty() {
        employee_query = employee_query.filter(employee::Column::Id.is_in(filter.employee_ids));
    }
    let employees = order_by_name(employee_query).all(db).await?;

    let position_ids: Vec<Uuid> = employees.iter().filter_map(|e| e.position_id).collect();
    let department_ids: Vec<Uuid> = employees.iter().filter_map(|e| e.department_id).collect();
    let positions: HashMap<Uuid, String> = if position_ids.is_empty() {
        HashMap::new()
    } else {
        position::Entity::find()
            .filter(position::Column::Id.is_in(position_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect()
    };
    let departments: HashMap<Uuid, String> = if department_ids.is_empty() {
        HashMap::new()
    } else {
        department::Entity::find()
            .filter(department::Column::Id.is_in(department_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|d| (d.id, d.name))
            .collect()
    };

    let records = if employees.is_empty() || programs.is_empty() {
        Vec::new()
    } else {
        training_record::Entity::find()
            .filter(training_record::Column::EmployeeId.is_in(employees.iter().map(|e| e.id)))
            .filter(training_record::Column::TrainingProgramId.is_in(programs.iter().map(|p| p.id)))
            .all(db)
            .await?
    };

    let staff = employees
        .into_iter()
        .map(|employee| StaffEntry {
            position: employee.position_id.and_then(|id| positions.get(&id).cloned()),
            department: employee.department_id.and_then(|id| departments.get(&id).cloned()),
            employee,
        })
        .collect();
    let report = build_report(as_of, staff, &programs, &records, filter.sort);
    info!(
        rows = report.rows.len(),
        programs = report.programs.len(),
        %as_of,
        "training report built"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn person(last: &str, first: &str) -> StaffEntry {
        let now = Utc::now().into();
        StaffEntry {
            employee: employee::Model {
                id: Uuid::new_v4(),
                last_name: last.into(),
                first_name: first.into(),
                middle_name: String::new(),
                birth_date: None,
                position_id: None,
                department_id: None,
                hire_date: None,
                is_dismissed: false,
                dismissal_date: None,
                is_on_maternity_leave: false,
                is_external_part_time: false,
                is_safety_commission_member: false,
                created_at: now,
                updated_at: now,
            },
            position: Some("Teacher".into()),
            department: None,
        }
    }

    fn program(name: &str, years: Option<i32>) -> training_program::Model {
        let now = Utc::now().into();
        training_program::Model {
            id: Uuid::new_v4(),
            name: name.into(),
            recurrence_years: years,
            created_at: now,
            updated_at: now,
        }
    }

    fn record(
        staff: &StaffEntry,
        program: &training_program::Model,
        completed: NaiveDate,
    ) -> training_record::Model {
        let now = Utc::now().into();
        training_record::Model {
            id: Uuid::new_v4(),
            employee_id: staff.employee.id,
            training_program_id: program.id,
            completion_date: completed,
            details: None,
            is_verified: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn short_name_uses_initials() {
        assert_eq!(short_name("Ivanova", "anna", "Petrovna"), "Ivanova A. P.");
        assert_eq!(short_name("Smith", "John", ""), "Smith J.");
        assert_eq!(short_name("", "", ""), "");
    }

    #[test]
    fn cells_use_latest_completion_and_summary_counts() {
        let as_of = date(2025, 6, 1);
        let safety = program("Labour safety", Some(3));
        let first_aid = program("First aid", None);
        let anna = person("Ivanova", "Anna");
        let boris = person("Petrov", "Boris");
        let records = vec![
            record(&anna, &safety, date(2020, 1, 10)),
            record(&anna, &safety, date(2024, 1, 10)),
            record(&boris, &safety, date(2022, 6, 20)),
            record(&boris, &first_aid, date(2010, 1, 1)),
        ];
        let programs = vec![first_aid.clone(), safety.clone()];
        let report = build_report(as_of, vec![anna, boris], &programs, &records, None);

        assert_eq!(report.summary.total_employees, 2);
        let anna_row = &report.rows[0];
        assert_eq!(anna_row.employee.short_name, "Ivanova A.");
        assert_eq!(anna_row.cells[0].status, TrainingStatus::NotCompleted);
        assert_eq!(anna_row.cells[1].status, TrainingStatus::Completed);
        assert_eq!(anna_row.cells[1].completion_date, Some(date(2024, 1, 10)));

        let boris_row = &report.rows[1];
        assert_eq!(boris_row.cells[0].status, TrainingStatus::Completed);
        assert_eq!(boris_row.cells[1].status, TrainingStatus::Warning);

        let aid = &report.summary.programs[0];
        assert_eq!((aid.trained, aid.not_completed, aid.completed), (1, 1, 1));
        let safe = &report.summary.programs[1];
        assert_eq!((safe.trained, safe.completed, safe.warning), (2, 1, 1));
    }

    #[test]
    fn sorting_keeps_missing_completions_last() {
        let as_of = date(2025, 6, 1);
        let safety = program("Labour safety", Some(3));
        let a = person("A", "One");
        let b = person("B", "Two");
        let c = person("C", "Three");
        let records = vec![
            record(&a, &safety, date(2023, 1, 1)),
            record(&c, &safety, date(2024, 1, 1)),
        ];
        let programs = vec![safety.clone()];

        let sort = |direction| {
            Some(ReportSort {
                program_id: safety.id,
                direction,
            })
        };
        let names = |report: &TrainingReport| {
            report
                .rows
                .iter()
                .map(|row| row.employee.full_name.clone())
                .collect::<Vec<_>>()
        };

        let asc = build_report(
            as_of,
            vec![a.clone(), b.clone(), c.clone()],
            &programs,
            &records,
            sort(SortDirection::Asc),
        );
        assert_eq!(names(&asc), ["A One", "C Three", "B Two"]);

        let desc = build_report(
            as_of,
            vec![a, b, c],
            &programs,
            &records,
            sort(SortDirection::Desc),
        );
        assert_eq!(names(&desc), ["C Three", "A One", "B Two"]);
    }

    #[test]
    fn unknown_sort_column_keeps_staff_order() {
        let safety = program("Labour safety", Some(3));
        let report = build_report(
            date(2025, 6, 1),
            vec![person("B", "Two"), person("A", "One")],
            &[safety],
            &[],
            Some(ReportSort {
                program_id: Uuid::new_v4(),
                direction: SortDirection::Asc,
            }),
        );
        assert_eq!(report.rows[0].employee.full_name, "B Two");
    }
}
