/// # Chairlog Example: Shop Inventory
///
/// A small stock-keeping domain on top of the event log: items are stocked
/// and bought, current stock is reconstituted from the stream, and every
/// command runs the optimistic read-reconstitute-append cycle with a retry on
/// version conflict.
///
/// ## Usage
///
/// ```sh
/// cargo run --example inventory
/// ```
use serde::{Deserialize, Serialize};

use chairlog::{
    Aggregate, Event, InMemoryLog, Log, LogError, Reconstituted, Result, event_names, load,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
enum ItemEvent {
    Stocked { amount: u64 },
    Bought { amount: u64 },
}

event_names! {
    ItemEvent {
        Stocked => "ItemStocked",
        Bought => "ItemBought",
    }
}

#[derive(Debug, Default)]
struct Item {
    amount_in_stock: i64,
}

impl Aggregate for Item {
    type Event = ItemEvent;

    fn applicable(name: &str) -> bool {
        matches!(name, "ItemStocked" | "ItemBought")
    }

    fn apply(&mut self, event: &ItemEvent) {
        match event {
            ItemEvent::Stocked { amount } => self.amount_in_stock += *amount as i64,
            ItemEvent::Bought { amount } => self.amount_in_stock -= *amount as i64,
        }
    }
}

// A stale writer re-reads and retries this many times before giving up.
const MAX_ATTEMPTS: u32 = 5;

struct ShopInventory<L: Log> {
    log: L,
}

impl<L: Log> ShopInventory<L> {
    fn new(log: L) -> Self {
        Self { log }
    }

    async fn item(&self, name: &str) -> Result<Option<Reconstituted<Item>>> {
        load::<Item, _>(&self.log, name).await
    }

    async fn stock_item(&self, name: &str, amount: u64) -> Result<()> {
        for _ in 0..MAX_ATTEMPTS {
            let version = self.log.current_version(name).await?;
            let event = Event::new(name, version + 1, ItemEvent::Stocked { amount })?;

            match self.log.append(event).await {
                Err(err) if err.is_conflict() => continue,
                outcome => return outcome,
            }
        }

        Err(LogError::Validation {
            aggregate_id: name.to_string(),
            reason: format!("gave up stocking after {MAX_ATTEMPTS} conflicts"),
        })
    }

    async fn buy_item(&self, name: &str, amount: u64) -> Result<()> {
        for _ in 0..MAX_ATTEMPTS {
            let item = self
                .item(name)
                .await?
                .ok_or_else(|| LogError::NotFound(name.to_string()))?;

            if item.state.amount_in_stock < amount as i64 {
                return Err(LogError::Validation {
                    aggregate_id: name.to_string(),
                    reason: format!(
                        "asked for {amount}, but only {} left in stock",
                        item.state.amount_in_stock
                    ),
                });
            }

            let event = Event::new(name, item.version + 1, ItemEvent::Bought { amount })?;
            match self.log.append(event).await {
                // Someone stocked or bought in between; the stock check must
                // be redone against the fresh state.
                Err(err) if err.is_conflict() => continue,
                outcome => return outcome,
            }
        }

        Err(LogError::Validation {
            aggregate_id: name.to_string(),
            reason: format!("gave up buying after {MAX_ATTEMPTS} conflicts"),
        })
    }

    async fn audit_item(&self, name: &str) -> Result<Vec<String>> {
        let events = self.log.all_for_aggregate(name).await?;
        Ok(events
            .iter()
            .map(|event| {
                format!(
                    "{} {}: {}",
                    event.timestamp.to_rfc2822(),
                    event.name,
                    event.payload_json()
                )
            })
            .collect())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let shop = ShopInventory::new(InMemoryLog::new());

    shop.stock_item("shoe-1", 12).await?;
    shop.buy_item("shoe-1", 5).await?;

    let shoe = shop.item("shoe-1").await?.expect("shoe-1 exists");
    assert_eq!(shoe.state.amount_in_stock, 7);
    assert_eq!(shoe.version, 2);
    println!("shoe-1: {} in stock (version {})", shoe.state.amount_in_stock, shoe.version);

    // Buying more than the stock fails validation before anything is appended.
    let err = shop.buy_item("shoe-1", 100).await.unwrap_err();
    println!("rejected: {err}");

    // Buying an item that was never stocked is not found.
    let err = shop.buy_item("hat-1", 1).await.unwrap_err();
    println!("rejected: {err}");

    for line in shop.audit_item("shoe-1").await? {
        println!("audit: {line}");
    }

    Ok(())
}
