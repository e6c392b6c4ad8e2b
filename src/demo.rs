use lazygrid::{FieldMap, Record};
use serde_json::Value;

const DEPARTMENTS: u64 = 150;
const TEAMS_PER_DEPARTMENT: u64 = 3;
const PEOPLE_PER_TEAM: u64 = 5;

const FIRST_NAMES: &[&str] = &[
    "Ana", "Bruno", "Carla", "Diogo", "Érica", "Fábio", "Gonçalo", "Helena", "Inês", "João",
];
const LAST_NAMES: &[&str] = &[
    "Silva", "Santos", "Ferreira", "Pereira", "Oliveira", "Costa", "Rodrigues", "Martins",
];

fn row(fields: &FieldMap, id: u64, name: String, role: &str, parent: Option<u64>) -> Record {
    let mut record = Record::new();
    record.insert(fields.id.clone(), Value::from(id));
    record.insert("name".to_string(), Value::from(name));
    record.insert("role".to_string(), Value::from(role));
    if let Some(parent) = parent {
        record.insert(fields.parent.clone(), Value::from(parent));
    }
    record
}

/// Departments, their teams and the people in each team, linked through the parent field.
pub(crate) fn organisation(fields: &FieldMap) -> Vec<Record> {
    let mut records = Vec::new();
    let mut next_id = 0_u64;
    let mut allocate = || {
        next_id += 1;
        next_id
    };

    for department in 1..=DEPARTMENTS {
        let department_id = allocate();
        records.push(row(
            fields,
            department_id,
            format!("Departamento {department:03}"),
            "departamento",
            None,
        ));

        for team in 1..=TEAMS_PER_DEPARTMENT {
            let team_id = allocate();
            records.push(row(
                fields,
                team_id,
                format!("Equipa {department:03}.{team}"),
                "equipa",
                Some(department_id),
            ));

            for person in 0..PEOPLE_PER_TEAM {
                let person_id = allocate();
                let seed = (person_id + person) as usize;
                let name = format!(
                    "{} {}",
                    FIRST_NAMES[seed % FIRST_NAMES.len()],
                    LAST_NAMES[(seed / FIRST_NAMES.len()) % LAST_NAMES.len()]
                );
                records.push(row(fields, person_id, name, "pessoa", Some(team_id)));
            }
        }
    }

    records
}
