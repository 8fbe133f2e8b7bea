//! Confirmed-data records captured by the data-collecting flows.
//!
//! Records deserialize straight from the extractor's JSON (Spanish wire
//! keys) and live in the session store between turns. Merging is monotone:
//! a field that is already set is never replaced, no matter what a later
//! extraction pass claims. Extraction is noisy turn-to-turn; without this
//! rule a confirmed email can vanish one message after the user gave it.

use {
    rand::Rng,
    serde::{Deserialize, Serialize},
};

/// Diagnostic service id, `ALT-` plus four digits.
pub fn new_service_id() -> String {
    format!("ALT-{}", rand::rng().random_range(1000..=9999))
}

fn merge_field(current: &mut Option<String>, newer: &Option<String>) {
    if current.is_none() && let Some(value) = newer {
        *current = Some(value.clone());
    }
}

fn filled(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Appointment capture (lead flow).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadRecord {
    pub id: String,
    pub phone: String,
    #[serde(rename = "nombre_completo")]
    pub full_name: Option<String>,
    /// DD/MM/YYYY.
    #[serde(rename = "fecha_cita")]
    pub appointment_date: Option<String>,
    /// HH:MM, 24h.
    #[serde(rename = "hora_cita")]
    pub appointment_time: Option<String>,
    #[serde(rename = "correo")]
    pub email: Option<String>,
    /// "si" or "no", only once the summary has been shown.
    #[serde(rename = "confirmacion")]
    pub confirmation: Option<String>,
    pub confirmed: bool,
}

impl LeadRecord {
    /// Fresh record for a first contact, with a generated service id.
    pub fn for_phone(phone: &str) -> Self {
        Self {
            id: new_service_id(),
            phone: phone.to_string(),
            ..Self::default()
        }
    }

    /// Null-only overwrite: set fields win over anything extracted later.
    pub fn merge_missing(&mut self, newer: &LeadRecord) {
        merge_field(&mut self.full_name, &newer.full_name);
        merge_field(&mut self.appointment_date, &newer.appointment_date);
        merge_field(&mut self.appointment_time, &newer.appointment_time);
        merge_field(&mut self.email, &newer.email);
        merge_field(&mut self.confirmation, &newer.confirmation);
    }

    /// All four required fields present and non-blank.
    pub fn is_complete(&self) -> bool {
        [
            &self.full_name,
            &self.appointment_date,
            &self.appointment_time,
            &self.email,
        ]
        .into_iter()
        .all(filled)
    }
}

/// Personnel-transfer capture (quote flow). Nested to match the request
/// form the prompt shows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferRecord {
    #[serde(rename = "empresa")]
    pub company: Option<String>,
    pub area: Option<String>,
    #[serde(rename = "fecha")]
    pub date: Option<String>,
    #[serde(rename = "hora_recojo")]
    pub pickup_time: Option<String>,
    #[serde(rename = "origen")]
    pub origin: TransferOrigin,
    #[serde(rename = "destino")]
    pub destination: TransferDestination,
    #[serde(rename = "motivo")]
    pub reason: Option<String>,
    #[serde(rename = "tipo_unidad")]
    pub vehicle_type: Option<String>,
    #[serde(rename = "observaciones")]
    pub notes: Option<String>,
    #[serde(rename = "aeropuerto")]
    pub airport: TransferAirport,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOrigin {
    #[serde(rename = "contacto")]
    pub contact: Option<String>,
    #[serde(rename = "direccion")]
    pub address: Option<String>,
    #[serde(rename = "ubicacion")]
    pub map_link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferDestination {
    #[serde(rename = "direccion")]
    pub address: Option<String>,
    #[serde(rename = "ubicacion")]
    pub map_link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferAirport {
    #[serde(rename = "numero_vuelo")]
    pub flight_number: Option<String>,
    #[serde(rename = "contacto_referencia")]
    pub contact_reference: Option<String>,
}

impl TransferRecord {
    /// Null-only overwrite, applied through the nested objects.
    pub fn merge_missing(&mut self, newer: &TransferRecord) {
        merge_field(&mut self.company, &newer.company);
        merge_field(&mut self.area, &newer.area);
        merge_field(&mut self.date, &newer.date);
        merge_field(&mut self.pickup_time, &newer.pickup_time);
        merge_field(&mut self.origin.contact, &newer.origin.contact);
        merge_field(&mut self.origin.address, &newer.origin.address);
        merge_field(&mut self.origin.map_link, &newer.origin.map_link);
        merge_field(&mut self.destination.address, &newer.destination.address);
        merge_field(&mut self.destination.map_link, &newer.destination.map_link);
        merge_field(&mut self.reason, &newer.reason);
        merge_field(&mut self.vehicle_type, &newer.vehicle_type);
        merge_field(&mut self.notes, &newer.notes);
        merge_field(&mut self.airport.flight_number, &newer.airport.flight_number);
        merge_field(
            &mut self.airport.contact_reference,
            &newer.airport.contact_reference,
        );
    }

    /// All fourteen required fields present and non-blank.
    pub fn is_complete(&self) -> bool {
        [
            &self.company,
            &self.area,
            &self.date,
            &self.pickup_time,
            &self.origin.contact,
            &self.origin.address,
            &self.origin.map_link,
            &self.destination.address,
            &self.destination.map_link,
            &self.reason,
            &self.vehicle_type,
            &self.notes,
            &self.airport.flight_number,
            &self.airport.contact_reference,
        ]
        .into_iter()
        .all(filled)
    }
}
