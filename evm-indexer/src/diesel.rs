pub mod schema {
    diesel::table! {
      blocks (number) {
          number -> Int8,
          hash -> VarChar,
          parent_hash -> VarChar,
          timestamp -> Int8,
          gas_limit -> Text,
          gas_used -> Text,
          miner -> VarChar,
          difficulty -> Nullable<Text>,
          total_difficulty -> Nullable<Text>,
          size -> Nullable<Int8>,
          extra_data -> Nullable<Text>,
          base_fee_per_gas -> Nullable<Text>,
          created_at -> Timestamptz,
          updated_at -> Timestamptz,
      }
    }

    diesel::table! {
      transactions (hash) {
          hash -> VarChar,
          block_number -> Int8,
          block_hash -> VarChar,
          transaction_index -> Int4,
          from_address -> VarChar,
          to_address -> Nullable<VarChar>,
          value -> Text,
          gas_limit -> Text,
          gas_used -> Nullable<Text>,
          gas_price -> Nullable<Text>,
          max_fee_per_gas -> Nullable<Text>,
          max_priority_fee_per_gas -> Nullable<Text>,
          nonce -> Text,
          input_data -> Nullable<Text>,
          status -> Nullable<Int4>,
          transaction_type -> Int4,
          created_at -> Timestamptz,
          updated_at -> Timestamptz,
      }
    }

    diesel::table! {
      event_logs (id) {
          id -> Int8,
          transaction_hash -> VarChar,
          block_number -> Int8,
          block_hash -> VarChar,
          log_index -> Int4,
          address -> VarChar,
          topic0 -> Nullable<VarChar>,
          topic1 -> Nullable<VarChar>,
          topic2 -> Nullable<VarChar>,
          topic3 -> Nullable<VarChar>,
          data -> Text,
          removed -> Bool,
          created_at -> Timestamptz,
      }
    }

    diesel::table! {
      indexer_state (id) {
          id -> Int4,
          last_indexed_block -> Int8,
          last_updated -> Timestamptz,
      }
    }

    diesel::joinable!(transactions -> blocks (block_number));

    diesel::allow_tables_to_appear_in_same_query!(blocks, transactions, event_logs);
}
