//! Command implementations and table rendering

use comfy_table::{presets::UTF8_FULL, Cell, Table};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::error::Result;

/// `relay status` — server reachability
pub async fn status(client: &ApiClient) -> Result<()> {
    if client.health_check().await? {
        println!("Server is healthy");
    } else {
        println!("Server is unreachable");
        std::process::exit(1);
    }
    Ok(())
}

/// `relay messages` — pending MessageBox entries for an interface
pub async fn messages(
    client: &ApiClient,
    interface: &str,
    subscriber: Option<&str>,
    limit: Option<i64>,
) -> Result<()> {
    let response = client.list_pending(interface, subscriber, limit).await?;

    if response.messages.is_empty() {
        println!("No pending messages for interface '{interface}'");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Message",
        "Producer",
        "Created",
        "Pending",
        "Processed",
        "Error",
    ]);

    for view in &response.messages {
        let count = |status: &str| {
            view.subscriptions
                .iter()
                .filter(|s| s.status == status)
                .count()
        };
        table.add_row(vec![
            Cell::new(view.message.id),
            Cell::new(&view.message.producing_adapter_name),
            Cell::new(&view.message.created_at),
            Cell::new(count("pending")),
            Cell::new(count("processed")),
            Cell::new(count("error")),
        ]);
    }

    println!("{table}");
    println!("{} pending message(s)", response.total);
    Ok(())
}

/// `relay message <id>` — one message with its subscription rows
pub async fn message(client: &ApiClient, message_id: Uuid) -> Result<()> {
    let view = client.get_message(message_id).await?;

    println!("Message:   {}", view.message.id);
    println!("Interface: {}", view.message.interface_name);
    println!("Producer:  {}", view.message.producing_adapter_name);
    println!("Status:    {}", view.message.status);
    println!("Created:   {}", view.message.created_at);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Subscription", "Subscriber", "Status", "Detail"]);

    for subscription in &view.subscriptions {
        let detail = subscription
            .error_message
            .as_deref()
            .or(subscription.processing_details.as_deref())
            .unwrap_or("");
        table.add_row(vec![
            Cell::new(subscription.id),
            Cell::new(&subscription.subscriber_adapter_name),
            Cell::new(&subscription.status),
            Cell::new(detail),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// `relay retry <subscription-id>` — re-drive an errored delivery
pub async fn retry(client: &ApiClient, subscription_id: Uuid) -> Result<()> {
    let response = client.retry_subscription(subscription_id).await?;
    if response.retried {
        println!("Subscription {} queued for retry", response.subscription_id);
    }
    Ok(())
}

/// `relay instances` — configured adapter instances
pub async fn instances(client: &ApiClient, interface: Option<&str>) -> Result<()> {
    let response = client.list_instances(interface).await?;

    if response.instances.is_empty() {
        println!("No adapter instances configured");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Guid",
        "Interface",
        "Instance",
        "Adapter",
        "Type",
        "Enabled",
        "Compute Unit",
    ]);

    for instance in &response.instances {
        table.add_row(vec![
            Cell::new(instance.instance_guid),
            Cell::new(&instance.interface_name),
            Cell::new(&instance.instance_name),
            Cell::new(&instance.adapter_name),
            Cell::new(&instance.adapter_type),
            Cell::new(instance.is_enabled),
            Cell::new(instance.compute_unit_id.as_deref().unwrap_or("-")),
        ]);
    }

    println!("{table}");
    println!("{} instance(s)", response.total);
    Ok(())
}

/// `relay instance-status <guid>` — orchestrator view of one instance
pub async fn instance_status(client: &ApiClient, instance_guid: Uuid) -> Result<()> {
    let response = client.instance_status(instance_guid).await?;

    println!("Instance:     {}", response.instance.instance_name);
    println!("Interface:    {}", response.instance.interface_name);
    println!(
        "Adapter:      {} ({})",
        response.instance.adapter_name, response.instance.adapter_type
    );
    println!("Compute unit: {}", response.compute_unit_id);
    println!("Status:       {}", response.status);
    if let Some(detail) = &response.detail {
        println!("Detail:       {detail}");
    }
    Ok(())
}
