use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    toggle_membership, CatalogError, Center, CenterFilters, CenterServiceCounts,
    CenterServiceSettings, CenterServiceView, CenterStatus, CreateCenterRequest, GeoPoint,
    GeocodedPlace, NearbyCenter, ServiceSettingsRequest, UpdateCenterRequest,
    DEFAULT_DAILY_CAPACITY,
};
use crate::services::geo::{haversine_km, is_valid_coordinate, DEFAULT_SEARCH_RADIUS_KM};
use crate::services::{Geocoder, ServiceCatalog};

pub struct CenterDirectory {
    supabase: SupabaseClient,
    catalog: ServiceCatalog,
    geocoder: Geocoder,
}

/// Which per-center service list a membership change applies to.
#[derive(Debug, Clone, Copy)]
enum ServiceList {
    Offered,
    Hidden,
}

impl ServiceList {
    fn column(self) -> &'static str {
        match self {
            ServiceList::Offered => "services",
            ServiceList::Hidden => "hidden_services",
        }
    }

    fn of(self, center: &mut Center) -> &mut Vec<Uuid> {
        match self {
            ServiceList::Offered => &mut center.services,
            ServiceList::Hidden => &mut center.hidden_services,
        }
    }
}

/// Postgres array literal, used to make a list write conditional on the list read.
fn array_literal(ids: &[Uuid]) -> String {
    let items = ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
    format!("{{{}}}", items)
}

impl CenterDirectory {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            catalog: ServiceCatalog::new(config),
            geocoder: Geocoder::new(config),
        }
    }

    pub async fn list_centers(&self, filters: &CenterFilters, auth_token: Option<&str>) -> Result<Vec<Center>, CatalogError> {
        let mut path = String::from("/rest/v1/centers?status=eq.active");

        if let Some(district) = filters.district.as_deref().filter(|d| !d.is_empty()) {
            path.push_str(&format!("&address->>district=eq.{}", urlencoding::encode(district)));
        }
        if let Some(city) = filters.city.as_deref().filter(|c| !c.is_empty()) {
            path.push_str(&format!("&address->>city=eq.{}", urlencoding::encode(city)));
        }
        path.push_str("&order=name.asc");

        debug!("Listing centers: {}", path);
        Ok(self.supabase.select(&path, auth_token).await?)
    }

    pub async fn get_center(&self, center_id: Uuid, auth_token: Option<&str>) -> Result<Center, CatalogError> {
        let path = format!("/rest/v1/centers?id=eq.{}", center_id);

        self.supabase
            .select_one(&path, auth_token)
            .await?
            .ok_or(CatalogError::CenterNotFound)
    }

    /// Center accepting bookings; inactive or under-maintenance centers read as missing.
    pub async fn get_active_center(&self, center_id: Uuid, auth_token: Option<&str>) -> Result<Center, CatalogError> {
        let center = self.get_center(center_id, auth_token).await?;
        if !center.is_active() {
            return Err(CatalogError::CenterNotFound);
        }
        Ok(center)
    }

    /// Active centers within `radius_km`, closest first.
    pub async fn nearby_centers(
        &self,
        origin: GeoPoint,
        radius_km: Option<f64>,
        auth_token: Option<&str>,
    ) -> Result<Vec<NearbyCenter>, CatalogError> {
        if !is_valid_coordinate(origin) {
            return Err(CatalogError::InvalidQuery("Invalid coordinates".to_string()));
        }

        let radius = radius_km.filter(|r| *r > 0.0).unwrap_or(DEFAULT_SEARCH_RADIUS_KM);
        let centers = self.list_centers(&CenterFilters::default(), auth_token).await?;

        Ok(rank_by_distance(centers, origin, radius))
    }

    /// Geocode a free-text place and rank the active centers around it.
    pub async fn search_centers(
        &self,
        query: &str,
        radius_km: Option<f64>,
        auth_token: Option<&str>,
    ) -> Result<(GeocodedPlace, Vec<NearbyCenter>), CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::InvalidQuery("Search query is required".to_string()));
        }

        let place = self.geocoder.locate(query).await?;
        let centers = self.nearby_centers(place.location, radius_km, auth_token).await?;
        Ok((place, centers))
    }

    pub async fn create_center(
        &self,
        admin_id: Uuid,
        request: CreateCenterRequest,
        auth_token: &str,
    ) -> Result<Center, CatalogError> {
        let name = request.name.as_deref().map(str::trim).unwrap_or_default();
        let (Some(address), Some(contact)) = (request.address, request.contact) else {
            return Err(CatalogError::InvalidQuery(
                "Name, address and contact are required".to_string(),
            ));
        };
        if name.is_empty() {
            return Err(CatalogError::InvalidQuery(
                "Name, address and contact are required".to_string(),
            ));
        }
        if !address.is_complete() {
            return Err(CatalogError::InvalidQuery("Address is incomplete".to_string()));
        }
        let capacity = request.max_appointments_per_day.unwrap_or(DEFAULT_DAILY_CAPACITY);
        if capacity == 0 {
            return Err(CatalogError::InvalidQuery("Daily capacity must be positive".to_string()));
        }

        let place = self.geocoder.locate(&address.one_line()).await?;

        let body = json!({
            "name": name,
            "address": address,
            "location": place.location,
            "contact": contact,
            "services": request.services,
            "hidden_services": [],
            "service_settings": {},
            "status": CenterStatus::Active,
            "registered_by": admin_id,
            "max_appointments_per_day": capacity,
            "rating": 0.0,
            "created_at": Utc::now().to_rfc3339(),
        });

        let center: Center = self.supabase.insert("centers", Some(auth_token), body).await?;
        info!("Center {} ({}) created by {}", center.id, center.name, admin_id);
        Ok(center)
    }

    /// Partial update; a new address is geocoded again.
    pub async fn update_center(
        &self,
        center_id: Uuid,
        request: UpdateCenterRequest,
        auth_token: &str,
    ) -> Result<Center, CatalogError> {
        self.get_center(center_id, Some(auth_token)).await?;

        let mut patch = serde_json::Map::new();
        if let Some(name) = request.name {
            if name.trim().is_empty() {
                return Err(CatalogError::InvalidQuery("Name cannot be blank".to_string()));
            }
            patch.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(address) = request.address {
            if !address.is_complete() {
                return Err(CatalogError::InvalidQuery("Address is incomplete".to_string()));
            }
            let place = self.geocoder.locate(&address.one_line()).await?;
            patch.insert("address".to_string(), json!(address));
            patch.insert("location".to_string(), json!(place.location));
        }
        if let Some(contact) = request.contact {
            patch.insert("contact".to_string(), json!(contact));
        }
        if let Some(services) = request.services {
            patch.insert("services".to_string(), json!(services));
        }
        if let Some(status) = request.status {
            patch.insert("status".to_string(), json!(status));
        }
        if let Some(capacity) = request.max_appointments_per_day {
            if capacity == 0 {
                return Err(CatalogError::InvalidQuery("Daily capacity must be positive".to_string()));
            }
            patch.insert("max_appointments_per_day".to_string(), json!(capacity));
        }
        if patch.is_empty() {
            return Err(CatalogError::InvalidQuery("Nothing to update".to_string()));
        }

        let path = format!("/rest/v1/centers?id=eq.{}", center_id);
        let rows: Vec<Center> = self.supabase.update(&path, Some(auth_token), Value::Object(patch)).await?;
        let center = rows.into_iter().next().ok_or(CatalogError::CenterNotFound)?;

        info!("Center {} updated", center_id);
        Ok(center)
    }

    /// Soft delete: the center stops taking bookings but its history stays.
    pub async fn deactivate_center(&self, center_id: Uuid, auth_token: &str) -> Result<(), CatalogError> {
        let path = format!("/rest/v1/centers?id=eq.{}", center_id);
        let rows: Vec<Value> = self.supabase
            .update(&path, Some(auth_token), json!({ "status": CenterStatus::Inactive }))
            .await?;
        if rows.is_empty() {
            return Err(CatalogError::CenterNotFound);
        }

        info!("Center {} deactivated", center_id);
        Ok(())
    }

    /// Write a changed service list, but only if nobody changed it since `before` was read.
    async fn write_list(
        &self,
        center_id: Uuid,
        list: ServiceList,
        before: &[Uuid],
        after: &[Uuid],
        auth_token: &str,
    ) -> Result<(), CatalogError> {
        let column = list.column();
        let path = format!(
            "/rest/v1/centers?id=eq.{}&{}=eq.{}",
            center_id,
            column,
            array_literal(before)
        );
        let rows: Vec<Value> = self.supabase
            .update(&path, Some(auth_token), json!({ column: after }))
            .await?;

        if rows.is_empty() {
            warn!("Center {} {} changed while being edited", center_id, column);
            return Err(CatalogError::ConcurrentUpdate);
        }
        Ok(())
    }

    async fn set_membership(
        &self,
        center: &mut Center,
        list: ServiceList,
        service_id: Uuid,
        present: bool,
        auth_token: &str,
    ) -> Result<bool, CatalogError> {
        let before = list.of(center).clone();
        if !toggle_membership(list.of(center), service_id, present) {
            return Ok(false);
        }

        let after = list.of(center).clone();
        self.write_list(center.id, list, &before, &after, auth_token).await?;
        Ok(true)
    }

    /// Offer or withdraw a service at a center. A hidden service cannot be offered.
    pub async fn set_service_enabled(
        &self,
        center_id: Uuid,
        service_id: Uuid,
        enabled: bool,
        auth_token: &str,
    ) -> Result<Center, CatalogError> {
        let mut center = self.get_center(center_id, Some(auth_token)).await?;

        if enabled {
            self.catalog.get_active_service(service_id, Some(auth_token)).await?;
            if center.hides(service_id) {
                return Err(CatalogError::InvalidQuery(
                    "Unhide this service before enabling it".to_string(),
                ));
            }
        }

        if self.set_membership(&mut center, ServiceList::Offered, service_id, enabled, auth_token).await? {
            info!(
                "Service {} {} at center {}",
                service_id,
                if enabled { "enabled" } else { "disabled" },
                center_id
            );
        }
        Ok(center)
    }

    pub async fn set_service_hidden(
        &self,
        center_id: Uuid,
        service_id: Uuid,
        hidden: bool,
        auth_token: &str,
    ) -> Result<Center, CatalogError> {
        self.catalog.get_active_service(service_id, Some(auth_token)).await?;
        let mut center = self.get_center(center_id, Some(auth_token)).await?;

        if self.set_membership(&mut center, ServiceList::Hidden, service_id, hidden, auth_token).await? {
            info!(
                "Service {} {} at center {}",
                service_id,
                if hidden { "hidden" } else { "unhidden" },
                center_id
            );
        }
        Ok(center)
    }

    /// Offer every active catalog service at the center; returns how many were added.
    pub async fn enable_all_services(&self, center_id: Uuid, auth_token: &str) -> Result<usize, CatalogError> {
        let mut center = self.get_center(center_id, Some(auth_token)).await?;
        let active = self.catalog.list_services(Some(auth_token)).await?;

        let before = center.services.clone();
        let added = active
            .iter()
            .filter(|service| toggle_membership(&mut center.services, service.id, true))
            .count();

        if added > 0 {
            self.write_list(center_id, ServiceList::Offered, &before, &center.services, auth_token).await?;
            info!("Enabled {} more services at center {}", added, center_id);
        }
        Ok(added)
    }

    /// Offer a new service at every active center. Centers that fail are logged and skipped.
    pub async fn offer_everywhere(&self, service_id: Uuid, auth_token: &str) -> Result<usize, CatalogError> {
        let centers = self.list_centers(&CenterFilters::default(), Some(auth_token)).await?;

        let mut updated = 0;
        for mut center in centers {
            match self.set_membership(&mut center, ServiceList::Offered, service_id, true, auth_token).await {
                Ok(true) => updated += 1,
                Ok(false) => {}
                Err(e) => warn!("Could not add service {} to center {}: {}", service_id, center.id, e),
            }
        }

        info!("Service {} assigned to {} centers", service_id, updated);
        Ok(updated)
    }

    pub async fn update_service_settings(
        &self,
        center_id: Uuid,
        service_id: Uuid,
        staff_id: Uuid,
        request: ServiceSettingsRequest,
        auth_token: &str,
    ) -> Result<CenterServiceSettings, CatalogError> {
        if request.custom_fees.is_some_and(|fee| !fee.is_finite() || fee < 0.0) {
            return Err(CatalogError::InvalidQuery("Fees cannot be negative".to_string()));
        }

        let mut center = self.get_center(center_id, Some(auth_token)).await?;
        if !center.offers(service_id) {
            return Err(CatalogError::InvalidQuery(
                "This service is not offered at the center".to_string(),
            ));
        }

        let settings = CenterServiceSettings {
            availability_notes: request.availability_notes.unwrap_or_default(),
            custom_fees: request.custom_fees,
            estimated_duration: request.estimated_duration,
            updated_at: Some(Utc::now()),
            updated_by: Some(staff_id),
        };
        center.service_settings.insert(service_id, settings.clone());

        let path = format!("/rest/v1/centers?id=eq.{}", center_id);
        let rows: Vec<Value> = self.supabase
            .update(&path, Some(auth_token), json!({ "service_settings": center.service_settings }))
            .await?;
        if rows.is_empty() {
            return Err(CatalogError::CenterNotFound);
        }

        info!("Settings for service {} at center {} updated by {}", service_id, center_id, staff_id);
        Ok(settings)
    }

    /// Every active catalog service, marked with this center's enabled/hidden state.
    pub async fn service_views(
        &self,
        center_id: Uuid,
        auth_token: &str,
    ) -> Result<(Vec<CenterServiceView>, CenterServiceCounts), CatalogError> {
        let center = self.get_center(center_id, Some(auth_token)).await?;
        let services = self.catalog.list_services(Some(auth_token)).await?;

        let views: Vec<CenterServiceView> = services
            .into_iter()
            .map(|service| CenterServiceView::new(service, &center))
            .collect();
        let counts = CenterServiceCounts::tally(&views);
        Ok((views, counts))
    }

    /// Services the center currently offers, with their local settings.
    pub async fn offered_services(&self, center_id: Uuid, auth_token: &str) -> Result<Vec<CenterServiceView>, CatalogError> {
        let center = self.get_center(center_id, Some(auth_token)).await?;
        let services = self.catalog.services_by_ids(&center.services, Some(auth_token)).await?;

        Ok(services.into_iter().map(|service| CenterServiceView::new(service, &center)).collect())
    }

    pub async fn hidden_services(&self, center_id: Uuid, auth_token: &str) -> Result<Vec<CenterServiceView>, CatalogError> {
        let center = self.get_center(center_id, Some(auth_token)).await?;
        let services = self.catalog.services_by_ids(&center.hidden_services, Some(auth_token)).await?;

        Ok(services.into_iter().map(|service| CenterServiceView::new(service, &center)).collect())
    }
}

pub fn rank_by_distance(centers: Vec<Center>, origin: GeoPoint, radius_km: f64) -> Vec<NearbyCenter> {
    let mut nearby: Vec<NearbyCenter> = centers
        .into_iter()
        .filter_map(|center| {
            let distance = haversine_km(origin, center.location?);
            (distance <= radius_km).then(|| NearbyCenter {
                center,
                distance: (distance * 100.0).round() / 100.0,
            })
        })
        .collect();

    nearby.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    nearby
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn center_at(name: &str, location: Option<(f64, f64)>) -> Center {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "name": name,
            "address": { "street": "", "city": "", "district": "", "state": "Kerala", "pincode": "" },
            "location": location.map(|(lat, lng)| json!({ "lat": lat, "lng": lng })),
            "contact": { "phone": "", "email": "" },
            "status": "active",
            "registered_by": null,
            "created_at": null
        }))
        .unwrap()
    }

    #[test]
    fn ranks_centers_closest_first_within_radius() {
        let origin = GeoPoint { lat: 8.5241, lng: 76.9366 };
        let centers = vec![
            center_at("Kochi", Some((9.9312, 76.2673))),
            center_at("Kowdiar", Some((8.5300, 76.9600))),
            center_at("No location", None),
            center_at("Pattom", Some((8.5200, 76.9400))),
        ];

        let ranked = rank_by_distance(centers, origin, 50.0);
        let names: Vec<&str> = ranked.iter().map(|n| n.center.name.as_str()).collect();

        assert_eq!(names, vec!["Pattom", "Kowdiar"]);
        assert!(ranked[0].distance <= ranked[1].distance);
    }

    #[test]
    fn array_literal_matches_postgres_syntax() {
        let a = Uuid::nil();
        assert_eq!(array_literal(&[]), "{}");
        assert_eq!(
            array_literal(&[a, a]),
            "{00000000-0000-0000-0000-000000000000,00000000-0000-0000-0000-000000000000}"
        );
    }

    #[test]
    fn default_capacity_applies_when_missing() {
        let center = center_at("Kowdiar", None);
        assert_eq!(center.max_appointments_per_day, 50);
        assert!(center.is_active());
    }
}
