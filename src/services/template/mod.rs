// Argument Template service
// CRUD operations for saved parameter sets

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use rusqlite::{params, Connection, Row};

use crate::models::field::FieldValue;
use crate::models::template::ArgumentTemplate;

const TEMPLATE_COLUMNS: &str =
    "id, name, script_name, field_values, extra_args, main_path, created_at";

pub struct TemplateService<'a> {
    conn: &'a Connection,
}

impl<'a> TemplateService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new template
    pub fn create(&self, template: ArgumentTemplate) -> Result<ArgumentTemplate> {
        template.validate().map_err(|e| anyhow::anyhow!(e))?;

        if self.name_exists(&template.script_name, &template.name, None)? {
            anyhow::bail!(
                "A template named '{}' already exists for {}",
                template.name,
                template.script_name
            );
        }

        let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let values = encode_values(&template.values)?;

        self.conn
            .execute(
                "INSERT INTO argument_templates
                 (name, script_name, field_values, extra_args, main_path, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    template.name,
                    template.script_name,
                    values,
                    template.extra_args,
                    template.main_path,
                    now,
                ],
            )
            .context("Failed to insert template")?;

        let id = self.conn.last_insert_rowid();
        self.get_by_id(id)
    }

    /// Get a template by ID
    pub fn get_by_id(&self, id: i64) -> Result<ArgumentTemplate> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM argument_templates WHERE id = ?1",
                    TEMPLATE_COLUMNS
                ),
                params![id],
                row_to_template,
            )
            .context("Template not found")
    }

    /// Templates saved for one script, ordered by name
    pub fn list_for_script(&self, script_name: &str) -> Result<Vec<ArgumentTemplate>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM argument_templates WHERE script_name = ?1 ORDER BY name ASC",
            TEMPLATE_COLUMNS
        ))?;

        let templates = stmt.query_map(params![script_name], row_to_template)?;

        templates
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to fetch templates")
    }

    /// Get all templates ordered by script, then name
    pub fn list_all(&self) -> Result<Vec<ArgumentTemplate>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM argument_templates ORDER BY script_name ASC, name ASC",
            TEMPLATE_COLUMNS
        ))?;

        let templates = stmt.query_map([], row_to_template)?;

        templates
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to fetch templates")
    }

    /// Update an existing template
    pub fn update(&self, template: &ArgumentTemplate) -> Result<()> {
        template.validate().map_err(|e| anyhow::anyhow!(e))?;

        let id = template
            .id
            .ok_or_else(|| anyhow::anyhow!("Template ID is required for update"))?;

        if self.name_exists(&template.script_name, &template.name, Some(id))? {
            anyhow::bail!(
                "A template named '{}' already exists for {}",
                template.name,
                template.script_name
            );
        }

        let values = encode_values(&template.values)?;

        self.conn
            .execute(
                "UPDATE argument_templates SET
                 name = ?1, script_name = ?2, field_values = ?3, extra_args = ?4, main_path = ?5
                 WHERE id = ?6",
                params![
                    template.name,
                    template.script_name,
                    values,
                    template.extra_args,
                    template.main_path,
                    id,
                ],
            )
            .context("Failed to update template")?;

        Ok(())
    }

    /// Delete a template by ID
    pub fn delete(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM argument_templates WHERE id = ?1", params![id])
            .context("Failed to delete template")?;

        Ok(())
    }

    /// Check if a template name is taken for a script (excluding a specific ID)
    pub fn name_exists(&self, script_name: &str, name: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count: i32 = if let Some(id) = exclude_id {
            self.conn.query_row(
                "SELECT COUNT(*) FROM argument_templates
                 WHERE script_name = ?1 AND name = ?2 AND id != ?3",
                params![script_name, name, id],
                |row| row.get(0),
            )?
        } else {
            self.conn.query_row(
                "SELECT COUNT(*) FROM argument_templates WHERE script_name = ?1 AND name = ?2",
                params![script_name, name],
                |row| row.get(0),
            )?
        };

        Ok(count > 0)
    }
}

fn encode_values(values: &BTreeMap<String, FieldValue>) -> Result<String> {
    serde_json::to_string(values).context("Failed to encode template values")
}

fn row_to_template(row: &Row) -> rusqlite::Result<ArgumentTemplate> {
    let raw: String = row.get(3)?;
    let values = serde_json::from_str(&raw).unwrap_or_else(|e| {
        log::warn!("Ignoring unreadable template values: {}", e);
        BTreeMap::new()
    });

    Ok(ArgumentTemplate {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        script_name: row.get(2)?,
        values,
        extra_args: row.get(4)?,
        main_path: row.get(5)?,
        created_at: parse_datetime(row.get::<_, Option<String>>(6)?),
    })
}

fn parse_datetime(s: Option<String>) -> Option<DateTime<Local>> {
    s.and_then(|s| {
        chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).single())
    })
}
