//! 棚卸し台帳
//!
//! セッションで確定した個数を商品ごとに反映する（メモリ上のみ、保存しない）。

use crate::error::{Result, ShelfCountError};
use crate::session::{CountReport, Reconciler};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 台帳の1商品
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub product_name: String,
    pub sku: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub is_counted: bool,
}

impl InventoryItem {
    pub fn new(id: &str, product_name: &str, sku: &str) -> Self {
        Self {
            id: id.to_string(),
            product_name: product_name.to_string(),
            sku: sku.to_string(),
            count: 0,
            is_counted: false,
        }
    }

    /// モデルに渡す対象物体名（商品名の小文字）
    pub fn expected_label(&self) -> String {
        self.product_name.to_lowercase()
    }

    fn set_count(&mut self, count: u32) {
        self.count = count;
        self.is_counted = count > 0;
    }

    fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.product_name.to_lowercase().contains(&query) || self.sku.to_lowercase().contains(&query)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLedger {
    items: Vec<InventoryItem>,
}

impl InventoryLedger {
    pub fn new(items: Vec<InventoryItem>) -> Self {
        Self { items }
    }

    /// 商品リスト未指定時のサンプル
    pub fn sample() -> Self {
        let mut items = vec![
            InventoryItem::new("1", "Wireless Mouse", "WM001"),
            InventoryItem::new("2", "Mechanical Keyboard", "KB002"),
            InventoryItem::new("3", "USB-C Cable", "USB003"),
            InventoryItem::new("4", "Monitor Stand", "MS004"),
            InventoryItem::new("5", "Water Bottle", "WB005"),
        ];
        items[1].set_count(5);
        items[3].set_count(2);
        Self::new(items)
    }

    /// 商品リストJSON（配列）を読み込む
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ShelfCountError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let items: Vec<InventoryItem> = serde_json::from_str(&content)?;
        Ok(Self::new(items))
    }

    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&InventoryItem> {
        self.items.iter().find(|i| i.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut InventoryItem> {
        self.items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| ShelfCountError::ItemNotFound(id.to_string()))
    }

    /// 商品名またはSKUで部分一致検索（大文字小文字無視）
    pub fn search(&self, query: &str) -> Vec<&InventoryItem> {
        let query = query.trim();
        if query.is_empty() {
            return self.items.iter().collect();
        }
        self.items.iter().filter(|i| i.matches(query)).collect()
    }

    pub fn increment(&mut self, id: &str) -> Result<u32> {
        let item = self.get_mut(id)?;
        item.set_count(item.count.saturating_add(1));
        Ok(item.count)
    }

    /// 0未満にはしない
    pub fn decrement(&mut self, id: &str) -> Result<u32> {
        let item = self.get_mut(id)?;
        item.set_count(item.count.saturating_sub(1));
        Ok(item.count)
    }

    pub fn set_count(&mut self, id: &str, count: u32) -> Result<()> {
        self.get_mut(id)?.set_count(count);
        Ok(())
    }

    /// (全商品数, カウント済み商品数)
    pub fn progress(&self) -> (usize, usize) {
        let counted = self.items.iter().filter(|i| i.is_counted).count();
        (self.items.len(), counted)
    }

    /// セッション確定結果の反映先
    pub fn slot(&mut self, id: &str) -> Result<ItemSlot<'_>> {
        Ok(ItemSlot { item: self.get_mut(id)? })
    }
}

/// 1商品への照合窓口
pub struct ItemSlot<'a> {
    item: &'a mut InventoryItem,
}

impl ItemSlot<'_> {
    pub fn item(&self) -> &InventoryItem {
        &*self.item
    }
}

impl Reconciler for ItemSlot<'_> {
    fn reconcile(&mut self, report: &CountReport) {
        tracing::info!(
            item = %self.item.id,
            sku = %self.item.sku,
            previous = self.item.count,
            count = report.final_count,
            "ledger updated"
        );
        self.item.set_count(report.final_count);
    }
}
