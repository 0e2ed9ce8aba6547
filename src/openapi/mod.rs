use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Autoshop API",
        version = "1.0.0",
        description = r#"
# Auto Shop Back Office API

Parts stock, procurements, service deployments, sales, expenses and monthly
forecasts for an auto repair and parts shop.

## Authentication

Sign in with `POST /api/v1/users` and send the returned token on every other
`/api/v1` request:

```
Authorization: Bearer <token>
```

`/health*` and `/clientPortal/search` are public.

## Lists

Collection endpoints take `_start`, `_end`, `_sort`, `_order` and any number of
`<field>_like=value` filters. The filtered total is returned in the
`x-total-count` header.

## Errors

```json
{
  "error": "Unprocessable Entity",
  "message": "Insufficient stock: Brake Pad (Bosch) has 2 left, 5 requested",
  "requestId": "6f1c...",
  "timestamp": "2026-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "users", description = "Sign-in and staff accounts"),
        (name = "properties", description = "Shop properties"),
        (name = "parts", description = "Parts catalogue and stock on hand"),
        (name = "procurements", description = "Parts bought from suppliers"),
        (name = "deployments", description = "Parts used on client vehicles"),
        (name = "sales", description = "Sales with output VAT"),
        (name = "expenses", description = "Expenses with input VAT"),
        (name = "forecast", description = "Monthly totals and projections"),
        (name = "client-portal", description = "Public job lookup"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::users::login_or_register,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::set_user_allowed,

        crate::handlers::properties::list_properties,
        crate::handlers::properties::create_property,
        crate::handlers::properties::get_property,
        crate::handlers::properties::update_property,
        crate::handlers::properties::delete_property,

        crate::handlers::parts::list_parts,
        crate::handlers::parts::create_part,
        crate::handlers::parts::get_part,
        crate::handlers::parts::update_part,
        crate::handlers::parts::delete_part,

        crate::handlers::procurements::list_procurements,
        crate::handlers::procurements::create_procurement,
        crate::handlers::procurements::get_procurement,
        crate::handlers::procurements::update_procurement,
        crate::handlers::procurements::delete_procurement,

        crate::handlers::deployments::list_deployments,
        crate::handlers::deployments::create_deployment,
        crate::handlers::deployments::get_deployment,
        crate::handlers::deployments::update_deployment,
        crate::handlers::deployments::delete_deployment,

        crate::handlers::sales::list_sales,
        crate::handlers::sales::create_sale,
        crate::handlers::sales::get_sale,
        crate::handlers::sales::update_sale,
        crate::handlers::sales::delete_sale,

        crate::handlers::expenses::list_expenses,
        crate::handlers::expenses::create_expense,
        crate::handlers::expenses::get_expense,
        crate::handlers::expenses::update_expense,
        crate::handlers::expenses::delete_expense,

        crate::handlers::forecasts::forecast,
        crate::handlers::forecasts::part_usage,

        crate::handlers::client_portal::search,

        crate::health::health_check,
        crate::health::liveness_check,
        crate::health::readiness_check,
    ),
    components(
        schemas(
            crate::handlers::common::DeletedResponse,
            crate::handlers::users::LoginResponse,
            crate::auth::IssuedToken,

            crate::services::users::LoginOrRegister,
            crate::services::users::SetAllowed,
            crate::services::users::UserView,
            crate::services::users::UserDetail,

            crate::services::properties::CreateProperty,
            crate::services::properties::UpdateProperty,
            crate::services::properties::PropertyView,
            crate::services::properties::PropertyDetail,

            crate::services::parts::CreatePart,
            crate::services::parts::UpdatePart,
            crate::services::parts::PartView,
            crate::services::parts::PartDetail,

            crate::services::procurements::CreateProcurement,
            crate::services::procurements::UpdateProcurement,
            crate::services::procurements::ProcurementView,

            crate::services::deployments::CreateDeployment,
            crate::services::deployments::UpdateDeployment,
            crate::services::deployments::DeploymentView,

            crate::services::sales::CreateSale,
            crate::services::sales::UpdateSale,
            crate::services::sales::SaleView,

            crate::services::expenses::CreateExpense,
            crate::services::expenses::UpdateExpense,
            crate::services::expenses::ExpenseView,

            crate::services::forecasting::ForecastResource,
            crate::services::forecasting::Forecast,
            crate::services::forecasting::MonthlyTotal,
            crate::services::forecasting::PartUsage,

            crate::services::client_portal::PortalDeployment,

            crate::health::HealthInfo,
            crate::health::ReadinessInfo,

            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_routes_and_bearer_scheme() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Autoshop API"));
        assert!(json.contains("/api/v1/procurements/{id}"));
        assert!(json.contains("/api/v1/forecast/part-usage"));
        assert!(json.contains("/clientPortal/search"));
        assert!(json.contains("bearer_auth"));
    }
}
