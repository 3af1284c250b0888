use chrono::{Duration, Utc};
use tracing::{error, info, warn, Instrument};

use airfreight_desk::catalog::NewCatalogRecord;
use airfreight_desk::confirm::auto_confirm;
use airfreight_desk::domain::{Condition, OrderDetails, OrderDraft};
use airfreight_desk::drafts::OrderQuery;
use airfreight_desk::flight_plan::{FlightSheet, RouteContext};
use airfreight_desk::products::ProductSheet;
use airfreight_desk::stocktake::{filter_locations, totals, AdditionEvent};
use airfreight_desk::{setup_tracing, DeskConfig, DeskSystem};

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = match std::env::args().nth(1) {
        Some(path) => DeskConfig::from_file(path),
        None => DeskConfig::from_env(),
    }
    .map_err(|e| e.to_string())?;

    setup_tracing(&config.log_filter);
    info!(data_dir = %config.data_dir.display(), "Starting airfreight desk");

    // Nobody is at the keyboard, so every prompt is accepted.
    let system = DeskSystem::start(&config, auto_confirm(true, config.mailbox_size))
        .await
        .map_err(|e| e.to_string())?;

    if config.catalog_seed.is_none() {
        for (identifier, uld_type, location) in [
            ("AKE12345LH", "AKE", "LH-FRA-Cargo"),
            ("AKE23456LH", "AKE", "LH-FRA-Cargo"),
            ("PMC54321LH", "PMC", "LH-FRA-Baggage"),
        ] {
            let record = NewCatalogRecord::regular(identifier, uld_type, location, Condition::Serviceable);
            if let Err(e) = system.catalog.create(record).await {
                warn!(error = %e, "Demo catalog record not created");
            }
        }
    }

    let span = tracing::info_span!("stock_take");
    async {
        let loaded = system.stock_take.load_catalog().await?;
        info!(loaded, "Stock take started");

        for event in [
            AdditionEvent::new("AKE12345LH", "LH-FRA-Cargo", Condition::Serviceable),
            AdditionEvent::new("PMC54321LH", "LH-FRA-Cargo", Condition::Damaged),
            AdditionEvent::new("ake77777xx", "LH-FRA-Baggage", Condition::Serviceable),
        ] {
            match system.stock_take.add_uld(event).await {
                Ok(outcome) => info!(?outcome, "ULD recorded"),
                Err(e) => warn!(error = %e, "ULD not recorded"),
            }
        }
        system.stock_take.remove_uld("PMC54321LH".to_string()).await?;

        let view = system.stock_take.snapshot().await?;
        let cargo = filter_locations(&view.groups, &["LH-FRA-Cargo".to_string()]);
        let all = totals(&view.groups);
        info!(
            locations = view.groups.len(),
            total = all.total,
            open = all.open,
            cargo_total = cargo.first().map(|g| g.counts.total).unwrap_or(0),
            "Stock take summary"
        );
        Ok::<_, airfreight_desk::error::StockTakeError>(())
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;

    let span = tracing::info_span!("order_processing");
    let order_result = async {
        let now = Utc::now();

        let mut products = ProductSheet::default();
        products.set_group(0, "Coolers");
        products.set_product(0, "CoolPro");
        products.set_code(0, "COO1234");
        products.set_quantity(0, Some(4));
        let products = products.summary();

        let mut details = OrderDetails::default();
        details.set_awb_prefix("020");
        details.set_awb_suffix("1234567");
        details.set_awb_origin("fra");
        details.set_awb_destination("jfk");
        details.lease.set_start(Some(now + Duration::days(3)), now);
        details.lease.set_booked_days(Some(10));

        let ctx = RouteContext::new(&products, &details.awb_origin, &details.awb_destination);
        let mut flights = FlightSheet::default();
        flights.set_flight_id(0, "lh400");
        flights.set_date(0, now + Duration::days(3), now);
        flights.set_origin(&ctx, 0, "FRA");
        flights.set_destination(&ctx, 0, "ORD");
        flights.set_product(&ctx, 0, "CoolPro");
        flights.set_quantity(&ctx, 0, Some(4));
        flights.add_entry();
        flights.set_flight_id(1, "ua901");
        flights.set_date(1, now + Duration::days(4), now);
        flights.set_origin(&ctx, 1, "ORD");
        flights.set_destination(&ctx, 1, "JFK");
        flights.set_product(&ctx, 1, "CoolPro");
        flights.set_quantity(&ctx, 1, Some(4));

        let report = flights.validate(&ctx);
        info!(ok = report.ok(), errors = ?report.errors(), "Flight plan checked");

        let draft = OrderDraft {
            id: None,
            order_type: "Lease".to_string(),
            supplier: "Envirotainer".to_string(),
            details,
            products,
            flights: flights.into_legs(),
        };

        let saved = system.order_desk.save_draft(draft).await?;
        info!(order_id = %saved.id, "Draft saved");
        let published = system.order_desk.publish(saved.to_draft()).await?;
        let rows = system.order_desk.list_orders(OrderQuery::default()).await?;
        info!(order_id = %published.id, listed = rows.len(), "Order published");
        Ok::<_, airfreight_desk::error::OrderError>(published.id)
    }
    .instrument(span)
    .await;

    match order_result {
        Ok(order_id) => info!(order_id = %order_id, "Order processed successfully"),
        Err(e) => error!(error = %e, "Order processing failed"),
    }

    system.shutdown().await;

    info!("Airfreight desk finished");
    Ok(())
}
