mod action;
mod codec;

pub use action::{parse_action, play, ActionError, ActionParser, PlayError, Rule};
pub use codec::{
    deserialize_game, deserialize_state, read_card, read_declaration, read_game, read_move,
    read_state, serialize_game, serialize_state, write_card, write_declaration, write_game,
    write_move, write_state, DeserializationError, Reader, Writer,
};
