/// # Chairlog Example: Boards & Cards
///
/// A Trello-flavored domain: boards hold named lists, cards live on a board
/// in one of its lists. Boards and cards are separate aggregates with
/// separate streams; commands that span both (moving a card) reconstitute
/// each side before deciding. Commands with natural idempotency keys reuse
/// deterministic event ids so a retried command is de-duplicated by the log.
///
/// ## Usage
///
/// ```sh
/// cargo run --example board
/// ```
use serde::{Deserialize, Serialize};

use chairlog::{
    Aggregate, Event, InMemoryLog, Log, LogError, Reconstituted, Result, event_names, load,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
enum BoardEvent {
    Created { board_name: String },
    ListAdded { list_name: String },
}

event_names! {
    BoardEvent {
        Created => "BoardCreated",
        ListAdded => "ListAddedToBoard",
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
enum CardEvent {
    Added {
        board_id: String,
        list_name: String,
        title: String,
        body: String,
    },
    Renamed {
        new_title: String,
    },
    Moved {
        list_name: String,
    },
}

event_names! {
    CardEvent {
        Added => "NewCardAddedToList",
        Renamed => "CardRenamed",
        Moved => "CardMovedToList",
    }
}

#[derive(Debug, Default)]
struct Board {
    name: String,
    lists: Vec<String>,
}

impl Board {
    fn has_list(&self, list_name: &str) -> bool {
        self.lists.iter().any(|list| list == list_name)
    }
}

impl Aggregate for Board {
    type Event = BoardEvent;

    fn applicable(name: &str) -> bool {
        matches!(name, "BoardCreated" | "ListAddedToBoard")
    }

    fn apply(&mut self, event: &BoardEvent) {
        match event {
            BoardEvent::Created { board_name } => {
                self.name = board_name.clone();
                self.lists.clear();
            }
            BoardEvent::ListAdded { list_name } => self.lists.push(list_name.clone()),
        }
    }

    // A stream can carry applicable events without a creation; a board with
    // no name was never created.
    fn created(&self) -> bool {
        !self.name.is_empty()
    }
}

#[derive(Debug, Default)]
struct Card {
    board_id: String,
    list_name: String,
    title: String,
    body: String,
}

impl Aggregate for Card {
    type Event = CardEvent;

    fn applicable(name: &str) -> bool {
        matches!(name, "NewCardAddedToList" | "CardRenamed" | "CardMovedToList")
    }

    fn apply(&mut self, event: &CardEvent) {
        match event {
            CardEvent::Added {
                board_id,
                list_name,
                title,
                body,
            } => {
                self.board_id = board_id.clone();
                self.list_name = list_name.clone();
                self.title = title.clone();
                self.body = body.clone();
            }
            CardEvent::Renamed { new_title } => self.title = new_title.clone(),
            CardEvent::Moved { list_name } => self.list_name = list_name.clone(),
        }
    }

    fn created(&self) -> bool {
        !self.board_id.is_empty()
    }
}

struct BoardService<L: Log> {
    log: L,
}

impl<L: Log> BoardService<L> {
    fn new(log: L) -> Self {
        Self { log }
    }

    async fn board(&self, board_id: &str) -> Result<Option<Reconstituted<Board>>> {
        load::<Board, _>(&self.log, board_id).await
    }

    async fn card(&self, card_id: &str) -> Result<Option<Reconstituted<Card>>> {
        load::<Card, _>(&self.log, card_id).await
    }

    async fn require_board(&self, board_id: &str) -> Result<Reconstituted<Board>> {
        self.board(board_id)
            .await?
            .ok_or_else(|| LogError::NotFound(board_id.to_string()))
    }

    async fn require_card(&self, card_id: &str) -> Result<Reconstituted<Card>> {
        self.card(card_id)
            .await?
            .ok_or_else(|| LogError::NotFound(card_id.to_string()))
    }

    async fn create_board(&self, board_id: &str, board_name: &str) -> Result<()> {
        if self.board(board_id).await?.is_some() {
            return Err(LogError::Validation {
                aggregate_id: board_id.to_string(),
                reason: "board already exists".to_string(),
            });
        }

        let event = Event::new(
            board_id,
            1,
            BoardEvent::Created {
                board_name: board_name.to_string(),
            },
        )?
        .with_event_id(format!("create-board-{board_id}"));

        self.log.append(event).await
    }

    async fn add_list(&self, board_id: &str, list_name: &str) -> Result<()> {
        let board = self.require_board(board_id).await?;

        if board.state.has_list(list_name) {
            return Err(LogError::Validation {
                aggregate_id: board_id.to_string(),
                reason: format!("board already has a list named '{list_name}'"),
            });
        }

        let event = Event::new(
            board_id,
            board.version + 1,
            BoardEvent::ListAdded {
                list_name: list_name.to_string(),
            },
        )?
        .with_event_id(format!("add-list-{list_name}-to-board-{board_id}"));

        self.log.append(event).await
    }

    async fn add_card(
        &self,
        card_id: &str,
        board_id: &str,
        list_name: &str,
        title: &str,
        body: &str,
    ) -> Result<()> {
        let board = self.require_board(board_id).await?;

        if !board.state.has_list(list_name) {
            return Err(LogError::Validation {
                aggregate_id: board_id.to_string(),
                reason: format!("board has no list named '{list_name}'"),
            });
        }

        let event = Event::new(
            card_id,
            1,
            CardEvent::Added {
                board_id: board_id.to_string(),
                list_name: list_name.to_string(),
                title: title.to_string(),
                body: body.to_string(),
            },
        )?
        .with_event_id(format!("add-card-{card_id}-to-board-{board_id}"));

        self.log.append(event).await
    }

    async fn rename_card(&self, card_id: &str, new_title: &str) -> Result<()> {
        let card = self.require_card(card_id).await?;

        let event = Event::new(
            card_id,
            card.version + 1,
            CardEvent::Renamed {
                new_title: new_title.to_string(),
            },
        )?;

        self.log.append(event).await
    }

    async fn move_card(&self, card_id: &str, list_name: &str) -> Result<()> {
        let card = self.require_card(card_id).await?;
        let board = self.require_board(&card.state.board_id).await?;

        if !board.state.has_list(list_name) {
            return Err(LogError::Validation {
                aggregate_id: card.state.board_id.clone(),
                reason: format!("board has no list named '{list_name}'"),
            });
        }

        let event = Event::new(
            card_id,
            card.version + 1,
            CardEvent::Moved {
                list_name: list_name.to_string(),
            },
        )?;

        self.log.append(event).await
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let service = BoardService::new(InMemoryLog::new());

    service.create_board("board-1", "Chores").await?;
    service.add_list("board-1", "todo").await?;
    service.add_list("board-1", "done").await?;

    service
        .add_card("card-1", "board-1", "todo", "Dishes", "All of them")
        .await?;
    service.rename_card("card-1", "Wash the dishes").await?;
    service.move_card("card-1", "done").await?;

    let card = service.card("card-1").await?.expect("card-1 exists");
    assert_eq!(card.state.title, "Wash the dishes");
    assert_eq!(card.state.list_name, "done");
    assert_eq!(card.version, 3);
    println!("card-1: '{}' on list '{}'", card.state.title, card.state.list_name);

    // Renaming a card that does not exist surfaces NotFound.
    let err = service.rename_card("card-404", "Nope").await.unwrap_err();
    println!("rejected: {err}");

    // Duplicate list names on one board fail validation.
    let err = service.add_list("board-1", "todo").await.unwrap_err();
    println!("rejected: {err}");

    let board = service.board("board-1").await?.expect("board-1 exists");
    assert_eq!(board.state.lists, vec!["todo".to_string(), "done".to_string()]);
    assert_eq!(board.version, 3);

    Ok(())
}
