//! Demo fixtures. Every insert is find-or-create by natural key, so running
//! the seed twice leaves the database unchanged.

use chrono::NaiveDate;
use entity::{app_user, department, employee, position, training_program, training_record};
use platform_api::{ApiError, ApiResult};
use platform_authz::Role;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use tracing::info;
use uuid::Uuid;

use crate::service::{
    now,
    users::{self, NewUser},
};

pub struct SeededRecords {
    pub users: Vec<app_user::Model>,
    pub departments: Vec<department::Model>,
    pub positions: Vec<position::Model>,
    pub programs: Vec<training_program::Model>,
    pub employees: Vec<employee::Model>,
    pub records: Vec<training_record::Model>,
}

impl SeededRecords {
    pub fn user_named(&self, username: &str) -> Option<&app_user::Model> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn department_named(&self, name: &str) -> Option<&department::Model> {
        self.departments.iter().find(|d| d.name == name)
    }

    pub fn program_named(&self, name: &str) -> Option<&training_program::Model> {
        self.programs.iter().find(|p| p.name == name)
    }

    pub fn employee_named(&self, last_name: &str) -> Option<&employee::Model> {
        self.employees.iter().find(|e| e.last_name == last_name)
    }
}

const SEED_USERS: [(&str, &str, Role); 5] = [
    ("admin", "Administrator", Role::Admin),
    ("mto", "Training moderator", Role::Moderator),
    ("ok", "HR office", Role::Editor),
    ("oob", "Safety office", Role::Editor),
    ("viewer", "Read-only auditor", Role::Viewer),
];

const SEED_DEPARTMENTS: [(&str, &str); 3] = [
    ("Administration", "Management and office staff"),
    ("Primary school", "Grades 1 to 4"),
    ("Maintenance", "Buildings and grounds"),
];

const SEED_POSITIONS: [(&str, bool, bool); 4] = [
    ("Director", true, false),
    ("Deputy director", true, true),
    ("Teacher", false, true),
    ("Caretaker", false, false),
];

const SEED_PROGRAMS: [(&str, Option<i32>); 4] = [
    ("Labour safety", Some(3)),
    ("First aid", Some(3)),
    ("Fire safety", Some(1)),
    ("Induction", None),
];

struct SeedEmployee {
    last: &'static str,
    first: &'static str,
    middle: &'static str,
    born: (i32, u32, u32),
    department: &'static str,
    position: &'static str,
    safety_commission: bool,
}

const SEED_EMPLOYEES: [SeedEmployee; 4] = [
    SeedEmployee {
        last: "Volkova",
        first: "Irina",
        middle: "Sergeevna",
        born: (1972, 3, 14),
        department: "Administration",
        position: "Director",
        safety_commission: true,
    },
    SeedEmployee {
        last: "Sokolov",
        first: "Andrei",
        middle: "Pavlovich",
        born: (1985, 11, 2),
        department: "Administration",
        position: "Deputy director",
        safety_commission: true,
    },
    SeedEmployee {
        last: "Morozova",
        first: "Elena",
        middle: "Viktorovna",
        born: (1990, 6, 21),
        department: "Primary school",
        position: "Teacher",
        safety_commission: false,
    },
    SeedEmployee {
        last: "Lebedev",
        first: "Nikolai",
        middle: "",
        born: (1968, 1, 30),
        department: "Maintenance",
        position: "Caretaker",
        safety_commission: false,
    },
];

/// (employee last name, program, completion date)
const SEED_RECORDS: [(&str, &str, (i32, u32, u32)); 6] = [
    ("Volkova", "Labour safety", (2024, 2, 12)),
    ("Volkova", "First aid", (2021, 9, 1)),
    ("Volkova", "Induction", (2005, 9, 1)),
    ("Sokolov", "Labour safety", (2022, 4, 18)),
    ("Sokolov", "Fire safety", (2025, 1, 20)),
    ("Morozova", "First aid", (2023, 10, 5)),
];

fn ymd((y, m, d): (i32, u32, u32)) -> ApiResult<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
        .ok_or_else(|| ApiError::internal(anyhow::anyhow!("invalid seed date {y}-{m}-{d}")))
}

/// Load the demo organisation. `password` is shared by every seeded account.
pub async fn seed_demo(db: &DatabaseConnection, password: &str) -> ApiResult<SeededRecords> {
    let mut seeded_users = Vec::new();
    for (username, display_name, role) in SEED_USERS {
        let existing = app_user::Entity::find()
            .filter(app_user::Column::Username.eq(username))
            .one(db)
            .await?;
        let user = match existing {
            Some(user) => user,
            None => {
                users::provision(
                    db,
                    NewUser {
                        username: username.into(),
                        display_name: display_name.into(),
                        password: password.into(),
                        roles: vec![role],
                    },
                )
                .await?
                .0
            }
        };
        seeded_users.push(user);
    }

    let mut departments = Vec::new();
    for (name, description) in SEED_DEPARTMENTS {
        let found = department::Entity::find()
            .filter(department::Column::Name.eq(name))
            .one(db)
            .await?;
        let model = match found {
            Some(model) => model,
            None => {
                department::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(name.into()),
                    description: Set(Some(description.into())),
                    created_at: Set(now()),
                    updated_at: Set(now()),
                }
                .insert(db)
                .await?
            }
        };
        departments.push(model);
    }

    let mut positions = Vec::new();
    for (name, is_manager, is_teacher) in SEED_POSITIONS {
        let found = position::Entity::find()
            .filter(position::Column::Name.eq(name))
            .one(db)
            .await?;
        let model = match found {
            Some(model) => model,
            None => {
                position::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(name.into()),
                    is_manager: Set(is_manager),
                    is_teacher: Set(is_teacher),
                    created_at: Set(now()),
                    updated_at: Set(now()),
                }
                .insert(db)
                .await?
            }
        };
        positions.push(model);
    }

    let mut programs = Vec::new();
    for (name, recurrence_years) in SEED_PROGRAMS {
        let found = training_program::Entity::find()
            .filter(training_program::Column::Name.eq(name))
            .one(db)
            .await?;
        let model = match found {
            Some(model) => model,
            None => {
                training_program::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(name.into()),
                    recurrence_years: Set(recurrence_years),
                    created_at: Set(now()),
                    updated_at: Set(now()),
                }
                .insert(db)
                .await?
            }
        };
        programs.push(model);
    }

    let mut employees = Vec::new();
    for seed in &SEED_EMPLOYEES {
        let born = ymd(seed.born)?;
        let found = employee::Entity::find()
            .filter(employee::Column::LastName.eq(seed.last))
            .filter(employee::Column::FirstName.eq(seed.first))
            .filter(employee::Column::MiddleName.eq(seed.middle))
            .filter(employee::Column::BirthDate.eq(born))
            .one(db)
            .await?;
        let model = match found {
            Some(model) => model,
            None => {
                let department_id = departments
                    .iter()
                    .find(|d| d.name == seed.department)
                    .map(|d| d.id);
                let position_id = positions
                    .iter()
                    .find(|p| p.name == seed.position)
                    .map(|p| p.id);
                employee::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    last_name: Set(seed.last.into()),
                    first_name: Set(seed.first.into()),
                    middle_name: Set(seed.middle.into()),
                    birth_date: Set(Some(born)),
                    position_id: Set(position_id),
                    department_id: Set(department_id),
                    hire_date: Set(None),
                    is_dismissed: Set(false),
                    dismissal_date: Set(None),
                    is_on_maternity_leave: Set(false),
                    is_external_part_time: Set(false),
                    is_safety_commission_member: Set(seed.safety_commission),
                    created_at: Set(now()),
                    updated_at: Set(now()),
                }
                .insert(db)
                .await?
            }
        };
        employees.push(model);
    }

    let mut records = Vec::new();
    for (last_name, program_name, completed) in SEED_RECORDS {
        let completed = ymd(completed)?;
        let (Some(person), Some(program)) = (
            employees.iter().find(|e| e.last_name == last_name),
            programs.iter().find(|p| p.name == program_name),
        ) else {
            continue;
        };
        let found = training_record::Entity::find()
            .filter(training_record::Column::EmployeeId.eq(person.id))
            .filter(training_record::Column::TrainingProgramId.eq(program.id))
            .filter(training_record::Column::CompletionDate.eq(completed))
            .one(db)
            .await?;
        let model = match found {
            Some(model) => model,
            None => {
                training_record::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    employee_id: Set(person.id),
                    training_program_id: Set(program.id),
                    completion_date: Set(completed),
                    details: Set(None),
                    is_verified: Set(true),
                    created_at: Set(now()),
                    updated_at: Set(now()),
                }
                .insert(db)
                .await?
            }
        };
        records.push(model);
    }

    info!(
        users = seeded_users.len(),
        departments = departments.len(),
        employees = employees.len(),
        records = records.len(),
        "demo data seeded"
    );
    Ok(SeededRecords {
        users: seeded_users,
        departments,
        positions,
        programs,
        employees,
        records,
    })
}
