//! Family collection repository.

use crate::model::family::{EmergencyContact, Family, FamilyId};
use crate::repo::{
    from_json, is_unique_violation, now_epoch_ms, parse_uuid, to_json, EntityKind, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub trait FamilyRepository {
    fn create_family(&self, family: &Family) -> RepoResult<FamilyId>;
    fn get_family(&self, id: FamilyId) -> RepoResult<Option<Family>>;
    /// All families whose email matches case-insensitively.
    fn find_families_by_email(&self, email: &str) -> RepoResult<Vec<Family>>;
    /// All families ordered by family name.
    fn list_families(&self) -> RepoResult<Vec<Family>>;
    fn update_emergency_contact(
        &self,
        id: FamilyId,
        contact: &EmergencyContact,
    ) -> RepoResult<Family>;
}

pub struct SqliteFamilyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFamilyRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

const FAMILY_COLUMNS: &str = "id, email, family_name, phone, photo_url, address, parents,
     children, child_ids, notes, emergency_contact, created_at, updated_at";

impl FamilyRepository for SqliteFamilyRepository<'_> {
    fn create_family(&self, family: &Family) -> RepoResult<FamilyId> {
        family.validate()?;
        let emergency_contact = family
            .emergency_contact
            .as_ref()
            .map(|contact| to_json(contact, "families.emergency_contact"))
            .transpose()?;
        let inserted = self.conn.execute(
            "INSERT INTO families (
                id, email, family_name, phone, photo_url, address, parents,
                children, child_ids, notes, emergency_contact, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12);",
            params![
                family.id.to_string(),
                family.email.trim().to_lowercase(),
                family.family_name.trim(),
                family.phone.trim(),
                family.photo_url,
                to_json(&family.address, "families.address")?,
                to_json(&family.parents, "families.parents")?,
                to_json(&family.children, "families.children")?,
                to_json(&family.child_ids, "families.child_ids")?,
                family.notes,
                emergency_contact,
                now_epoch_ms(),
            ],
        );
        match inserted {
            Ok(_) => Ok(family.id),
            Err(err) if is_unique_violation(&err) => {
                Err(RepoError::Duplicate(EntityKind::Family, family.id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_family(&self, id: FamilyId) -> RepoResult<Option<Family>> {
        let sql = format!("SELECT {FAMILY_COLUMNS} FROM families WHERE id = ?1;");
        self.conn
            .query_row(&sql, [id.to_string()], |row| Ok(parse_family_row(row)))
            .optional()?
            .transpose()
    }

    fn find_families_by_email(&self, email: &str) -> RepoResult<Vec<Family>> {
        let sql = format!(
            "SELECT {FAMILY_COLUMNS} FROM families
             WHERE email = ?1 COLLATE NOCASE
             ORDER BY created_at ASC, id ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([email.trim()])?;
        let mut families = Vec::new();
        while let Some(row) = rows.next()? {
            families.push(parse_family_row(row)?);
        }
        Ok(families)
    }

    fn list_families(&self) -> RepoResult<Vec<Family>> {
        let sql = format!(
            "SELECT {FAMILY_COLUMNS} FROM families
             ORDER BY family_name COLLATE NOCASE ASC, id ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut families = Vec::new();
        while let Some(row) = rows.next()? {
            families.push(parse_family_row(row)?);
        }
        Ok(families)
    }

    fn update_emergency_contact(
        &self,
        id: FamilyId,
        contact: &EmergencyContact,
    ) -> RepoResult<Family> {
        contact.validate()?;
        let changed = self.conn.execute(
            "UPDATE families SET emergency_contact = ?2, updated_at = ?3 WHERE id = ?1;",
            params![
                id.to_string(),
                to_json(contact, "families.emergency_contact")?,
                now_epoch_ms(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Family, id));
        }
        self.get_family(id)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Family, id))
    }
}

fn parse_family_row(row: &Row<'_>) -> RepoResult<Family> {
    let id_text: String = row.get("id")?;
    let address: String = row.get("address")?;
    let parents: String = row.get("parents")?;
    let children: String = row.get("children")?;
    let child_ids: String = row.get("child_ids")?;
    let emergency_contact: Option<String> = row.get("emergency_contact")?;

    Ok(Family {
        id: parse_uuid(&id_text, "families.id")?,
        email: row.get("email")?,
        family_name: row.get("family_name")?,
        phone: row.get("phone")?,
        photo_url: row.get("photo_url")?,
        address: from_json(&address, "families.address")?,
        parents: from_json(&parents, "families.parents")?,
        children: from_json(&children, "families.children")?,
        child_ids: from_json(&child_ids, "families.child_ids")?,
        notes: row.get("notes")?,
        emergency_contact: emergency_contact
            .map(|text| from_json(&text, "families.emergency_contact"))
            .transpose()?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
