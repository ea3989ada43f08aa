pub mod coordination_engine;
