//! Cross-structure tests for allocators and stores used together
